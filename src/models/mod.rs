pub mod account;
pub mod market;

pub use account::{FaucetStatus, Rights, WalletBalances};
pub use market::{
    ActiveMarkets, ClaimAffordance, Market, MarketMetadata, MarketRecord, Outcome,
    Probabilities, TimeLeft, DEFAULT_IMAGE, TEST_IMAGE,
};
