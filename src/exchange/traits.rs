use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::TradingError;
use crate::models::instrument::InstrumentFilters;
use crate::models::order::{OrderLookup, OrderRequest, OrderResult};

/// The `ExchangeClient` trait defines the authenticated calls the execution core needs.
/// It is implemented by the network connector and by the in-memory fake.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Fetch trading filters for a symbol. Fails with `InstrumentNotFound` for unknown symbols.
    async fn fetch_instrument_filters(&self, symbol: &str) -> Result<InstrumentFilters, TradingError>;

    /// Fetch the current mark price for a symbol
    async fn fetch_mark_price(&self, symbol: &str) -> Result<Decimal, TradingError>;

    /// Submit a new order. Exactly one attempt, no retry.
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderResult, TradingError>;

    /// Query an order by exchange id or client order id
    async fn fetch_order_status(&self, symbol: &str, lookup: &OrderLookup) -> Result<OrderResult, TradingError>;
}
