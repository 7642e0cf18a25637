//! 명령 계층
//!
//! CLI 와 대화형 메뉴가 공유하는 다섯 가지 명령. 입력은 코어에 도달하기 전에 검증한다.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::core::cancel::CancelToken;
use crate::core::twap_scheduler::{TwapExecution, TwapScheduler};
use crate::error::TradingError;
use crate::models::order::{OrderId, OrderLookup, OrderResult, OrderSide, TimeInForce};
use crate::order_core::executor::OrderExecutor;
use crate::order_core::validator::{ensure_positive, ensure_slices, parse_side, parse_symbol};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PlaceMarket { symbol: String, side: OrderSide, quantity: Decimal, reduce_only: bool },
    PlaceLimit { symbol: String, side: OrderSide, quantity: Decimal, price: Decimal, time_in_force: TimeInForce },
    PlaceStopLimit { symbol: String, side: OrderSide, quantity: Decimal, stop_price: Decimal, price: Decimal, time_in_force: TimeInForce },
    RunTwap { symbol: String, side: OrderSide, total_quantity: Decimal, slices: usize, interval: Duration },
    OrderStatus { symbol: String, lookup: OrderLookup },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutput {
    Order(OrderResult),
    Twap(TwapExecution),
}

impl Command {
    pub fn market(symbol: &str, side: &str, quantity: Decimal) -> Result<Self, TradingError> {
        Ok(Command::PlaceMarket {
            symbol: parse_symbol(symbol)?,
            side: parse_side(side)?,
            quantity: ensure_positive("quantity", quantity)?,
            reduce_only: false,
        })
    }

    pub fn limit(symbol: &str, side: &str, quantity: Decimal, price: Decimal) -> Result<Self, TradingError> {
        Ok(Command::PlaceLimit {
            symbol: parse_symbol(symbol)?,
            side: parse_side(side)?,
            quantity: ensure_positive("quantity", quantity)?,
            price: ensure_positive("price", price)?,
            time_in_force: TimeInForce::default(),
        })
    }

    pub fn stop_limit(
        symbol: &str,
        side: &str,
        quantity: Decimal,
        stop_price: Decimal,
        price: Decimal,
    ) -> Result<Self, TradingError> {
        Ok(Command::PlaceStopLimit {
            symbol: parse_symbol(symbol)?,
            side: parse_side(side)?,
            quantity: ensure_positive("quantity", quantity)?,
            stop_price: ensure_positive("stop price", stop_price)?,
            price: ensure_positive("price", price)?,
            time_in_force: TimeInForce::default(),
        })
    }

    pub fn twap(
        symbol: &str,
        side: &str,
        total_quantity: Decimal,
        slices: usize,
        interval_secs: u64,
    ) -> Result<Self, TradingError> {
        Ok(Command::RunTwap {
            symbol: parse_symbol(symbol)?,
            side: parse_side(side)?,
            total_quantity: ensure_positive("total quantity", total_quantity)?,
            slices: ensure_slices(slices)?,
            interval: Duration::from_secs(interval_secs),
        })
    }

    /// `order_id` 와 `client_order_id` 중 하나는 있어야 함 (둘 다 있으면 order_id 우선)
    pub fn order_status(
        symbol: &str,
        order_id: Option<String>,
        client_order_id: Option<String>,
    ) -> Result<Self, TradingError> {
        let lookup = match (order_id.filter(|s| !s.trim().is_empty()), client_order_id.filter(|s| !s.trim().is_empty())) {
            (Some(id), _) => OrderLookup::OrderId(OrderId(id.trim().to_string())),
            (None, Some(cid)) => OrderLookup::ClientOrderId(cid.trim().to_string()),
            (None, None) => {
                return Err(TradingError::InvalidParameter("order id or client order id required".to_string()))
            }
        };
        Ok(Command::OrderStatus { symbol: parse_symbol(symbol)?, lookup })
    }

    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        match &mut self {
            Command::PlaceLimit { time_in_force, .. } | Command::PlaceStopLimit { time_in_force, .. } => *time_in_force = tif,
            _ => {}
        }
        self
    }

    pub fn with_reduce_only(mut self, flag: bool) -> Self {
        if let Command::PlaceMarket { reduce_only, .. } = &mut self {
            *reduce_only = flag;
        }
        self
    }
}

/// 명령 실행
pub async fn dispatch(
    executor: &OrderExecutor,
    scheduler: &TwapScheduler,
    command: Command,
    cancel: &CancelToken,
) -> Result<CommandOutput, TradingError> {
    match command {
        Command::PlaceMarket { symbol, side, quantity, reduce_only } => executor
            .submit_market(&symbol, side, quantity, reduce_only)
            .await
            .map(CommandOutput::Order),
        Command::PlaceLimit { symbol, side, quantity, price, time_in_force } => executor
            .submit_limit(&symbol, side, quantity, price, time_in_force, false)
            .await
            .map(CommandOutput::Order),
        Command::PlaceStopLimit { symbol, side, quantity, stop_price, price, time_in_force } => executor
            .submit_stop_limit(&symbol, side, quantity, stop_price, price, time_in_force)
            .await
            .map(CommandOutput::Order),
        Command::RunTwap { symbol, side, total_quantity, slices, interval } => scheduler
            .run_twap_with_cancel(&symbol, side, total_quantity, slices, interval, cancel)
            .await
            .map(CommandOutput::Twap),
        Command::OrderStatus { symbol, lookup } => executor
            .order_status(&symbol, &lookup)
            .await
            .map(CommandOutput::Order),
    }
}
