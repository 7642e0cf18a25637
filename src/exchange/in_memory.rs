use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;

use crate::error::TradingError;
use crate::exchange::traits::ExchangeClient;
use crate::models::instrument::InstrumentFilters;
use crate::models::order::{OrderId, OrderKind, OrderLookup, OrderRequest, OrderResult, OrderStatus};
use crate::utils::current_timestamp_ms;

/// A failure to return from a specific submission
#[derive(Debug, Clone)]
pub enum InjectedFailure {
    Rejected { code: Option<i64>, reason: String },
    Transport(String),
}

impl InjectedFailure {
    fn to_error(&self) -> TradingError {
        match self {
            InjectedFailure::Rejected { code, reason } => TradingError::OrderRejected { code: *code, reason: reason.clone() },
            InjectedFailure::Transport(msg) => TradingError::TransportError(msg.clone()),
        }
    }
}

#[derive(Default)]
struct State {
    submitted: Vec<OrderRequest>,
    results: HashMap<OrderId, OrderResult>,
    failures: HashMap<usize, InjectedFailure>,
    filter_fetches: usize,
    mark_price_fetches: usize,
    order_id_counter: u64,
}

/// An in-memory implementation of `ExchangeClient` for tests and dry runs
pub struct InMemoryExchange {
    instruments: HashMap<String, InstrumentFilters>,
    mark_prices: HashMap<String, Decimal>,
    state: Mutex<State>,
}

impl InMemoryExchange {
    pub fn new() -> Self {
        Self {
            instruments: HashMap::new(),
            mark_prices: HashMap::new(),
            state: Mutex::new(State::default()),
        }
    }

    /// Seeded with testnet-like BTCUSDT and ETHUSDT instruments
    pub fn with_default_instruments() -> Self {
        Self::new()
            .with_instrument(
                InstrumentFilters::new("BTCUSDT").with_min_notional(dec!(100)).with_step_size(dec!(0.001)),
                dec!(60000),
            )
            .with_instrument(
                InstrumentFilters::new("ETHUSDT").with_min_notional(dec!(20)).with_step_size(dec!(0.001)),
                dec!(3000),
            )
    }

    pub fn with_instrument(mut self, filters: InstrumentFilters, mark_price: Decimal) -> Self {
        self.mark_prices.insert(filters.symbol.clone(), mark_price);
        self.instruments.insert(filters.symbol.clone(), filters);
        self
    }

    /// Fail the `nth` submission (1-based) with the given failure
    pub fn with_failure_on_submission(mut self, nth: usize, failure: InjectedFailure) -> Self {
        self.state.get_mut().failures.insert(nth, failure);
        self
    }

    /// All submitted requests in submission order, including failed ones
    pub async fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.state.lock().await.submitted.clone()
    }

    pub async fn submission_count(&self) -> usize {
        self.state.lock().await.submitted.len()
    }

    pub async fn filter_fetch_count(&self) -> usize {
        self.state.lock().await.filter_fetches
    }

    pub async fn mark_price_fetch_count(&self) -> usize {
        self.state.lock().await.mark_price_fetches
    }

    fn mark_price_of(&self, symbol: &str) -> Result<Decimal, TradingError> {
        self.mark_prices
            .get(symbol)
            .copied()
            .ok_or_else(|| TradingError::InstrumentNotFound(symbol.to_string()))
    }
}

impl Default for InMemoryExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeClient for InMemoryExchange {
    async fn fetch_instrument_filters(&self, symbol: &str) -> Result<InstrumentFilters, TradingError> {
        self.state.lock().await.filter_fetches += 1;
        self.instruments
            .get(symbol)
            .cloned()
            .ok_or_else(|| TradingError::InstrumentNotFound(symbol.to_string()))
    }

    async fn fetch_mark_price(&self, symbol: &str) -> Result<Decimal, TradingError> {
        self.state.lock().await.mark_price_fetches += 1;
        self.mark_price_of(symbol)
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderResult, TradingError> {
        let mut state = self.state.lock().await;
        state.submitted.push(order.clone());

        let nth = state.submitted.len();
        if let Some(failure) = state.failures.get(&nth) {
            return Err(failure.to_error());
        }
        if !self.instruments.contains_key(&order.symbol) {
            return Err(TradingError::OrderRejected { code: Some(-1121), reason: "Invalid symbol.".to_string() });
        }

        state.order_id_counter += 1;
        let order_id = OrderId(format!("mem-{}", state.order_id_counter));

        // 시장가는 즉시 체결, 지정가/스탑은 미체결 상태로 대기
        let (status, executed_qty, avg_price) = match order.kind {
            OrderKind::Market => (OrderStatus::Filled, order.quantity, self.mark_price_of(&order.symbol)?),
            OrderKind::Limit | OrderKind::StopLimit => (OrderStatus::New, Decimal::ZERO, Decimal::ZERO),
        };

        let result = OrderResult {
            order_id: order_id.clone(),
            client_order_id: Some(order.client_order_id.clone()),
            symbol: order.symbol.clone(),
            side: order.side,
            kind: order.kind,
            status,
            orig_qty: order.quantity,
            executed_qty,
            price: order.price.unwrap_or(Decimal::ZERO),
            avg_price,
            stop_price: order.stop_price,
            time_in_force: order.time_in_force,
            reduce_only: order.reduce_only,
            update_time: current_timestamp_ms(),
        };
        state.results.insert(order_id, result.clone());
        Ok(result)
    }

    async fn fetch_order_status(&self, symbol: &str, lookup: &OrderLookup) -> Result<OrderResult, TradingError> {
        let state = self.state.lock().await;
        let found = match lookup {
            OrderLookup::OrderId(id) => state.results.get(id),
            OrderLookup::ClientOrderId(client_id) => state
                .results
                .values()
                .find(|r| r.client_order_id.as_deref() == Some(client_id.as_str())),
        };
        found
            .filter(|r| r.symbol == symbol)
            .cloned()
            .ok_or_else(|| TradingError::OrderNotFound(lookup.to_string()))
    }
}
