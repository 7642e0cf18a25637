//! 거래소 연결 계층

pub mod binance_futures;
pub mod in_memory;
pub mod traits;

pub use binance_futures::BinanceFuturesClient;
pub use in_memory::{InMemoryExchange, InjectedFailure};
pub use traits::ExchangeClient;
