pub mod market_scanner;

pub use market_scanner::MarketScannerWorker;
