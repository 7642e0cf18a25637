use std::sync::Arc;

use rust_decimal::Decimal;

use crate::config::ExecutionConfig;
use crate::error::TradingError;
use crate::exchange::traits::ExchangeClient;
use crate::models::order::{OrderLookup, OrderRequest, OrderResult, OrderSide, TimeInForce};
use crate::order_core::normalizer::QuantityNormalizer;
use crate::utils::logging;

/// 주문 실행기 - 수량 보정 후 단일 주문 제출
///
/// 제출은 호출당 한 번만 시도하며 재시도는 호출자 책임.
pub struct OrderExecutor {
    client: Arc<dyn ExchangeClient>,
    normalizer: QuantityNormalizer,
}

impl OrderExecutor {
    pub fn new(client: Arc<dyn ExchangeClient>, config: &ExecutionConfig) -> Self {
        OrderExecutor {
            normalizer: QuantityNormalizer::new(client.clone(), config.default_min_notional, config.quantity_precision),
            client,
        }
    }

    /// 시장가 주문 (마크 가격 기준으로 수량 보정)
    pub async fn submit_market(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        reduce_only: bool,
    ) -> Result<OrderResult, TradingError> {
        let order = OrderRequest::market(symbol, side, quantity).with_reduce_only(reduce_only);
        self.submit("submit_market", order).await
    }

    /// 지정가 주문 (가격은 그대로, 수량만 보정)
    pub async fn submit_limit(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        time_in_force: TimeInForce,
        reduce_only: bool,
    ) -> Result<OrderResult, TradingError> {
        let order = OrderRequest::limit(symbol, side, quantity, price)
            .with_time_in_force(time_in_force)
            .with_reduce_only(reduce_only);
        self.submit("submit_limit", order).await
    }

    /// 스탑 지정가 주문 - 트리거 가격과 실행 가격 모두 전달
    pub async fn submit_stop_limit(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
        price: Decimal,
        time_in_force: TimeInForce,
    ) -> Result<OrderResult, TradingError> {
        let order = OrderRequest::stop_limit(symbol, side, quantity, stop_price, price)
            .with_time_in_force(time_in_force);
        self.submit("submit_stop_limit", order).await
    }

    /// 공통 제출 경로: 보정 -> 로그 -> 제출 -> 로그
    pub async fn submit(&self, operation: &str, order: OrderRequest) -> Result<OrderResult, TradingError> {
        let adjustment = self
            .normalizer
            .normalize(&order.symbol, order.quantity, order.price)
            .await
            .map_err(|e| {
                logging::log_error(operation, &e);
                e
            })?;
        logging::log_quantity_adjustment(&order.symbol, &adjustment);

        let order = order.with_quantity(adjustment.adjusted);
        logging::log_order_submission(operation, &order);

        match self.client.create_order(&order).await {
            Ok(result) => {
                logging::log_order_response(operation, &result);
                Ok(result)
            }
            Err(e) => {
                logging::log_error(operation, &e);
                Err(e)
            }
        }
    }

    /// 주문 상태 조회
    pub async fn order_status(&self, symbol: &str, lookup: &OrderLookup) -> Result<OrderResult, TradingError> {
        match self.client.fetch_order_status(symbol, lookup).await {
            Ok(result) => {
                logging::log_order_response("order_status", &result);
                Ok(result)
            }
            Err(e) => {
                logging::log_error("order_status", &e);
                Err(e)
            }
        }
    }
}
