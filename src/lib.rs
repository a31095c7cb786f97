//! Client library for an LMSR binary prediction market: cached contract
//! reads, approve-then-act spending, receipt tracking with read refresh,
//! form validation, and the faucet HTTP service.

pub mod actions;
pub mod api;
pub mod board;
pub mod client;
pub mod config;
pub mod contracts;
pub mod error;
pub mod forms;
pub mod invalidation;
pub mod models;
pub mod reads;
pub mod receipts;
pub mod server;
pub mod units;
pub mod wallet;
pub mod workers;

#[cfg(test)]
mod testing;
