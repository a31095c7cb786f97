pub mod chain;
pub mod faucet;
pub mod ipfs;

pub use chain::RpcChain;
pub use faucet::{EthFaucet, FaucetApiClient};
pub use ipfs::{IpfsGateway, MetadataStore};
