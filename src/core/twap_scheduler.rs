/**
* filename : twap_scheduler
* author : HAMA
* date: 2025. 5. 8.
* description: 고정 간격 시장가 분할 실행 (TWAP)
**/

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::core::cancel::{cancellable_delay, CancelToken};
use crate::error::TradingError;
use crate::models::order::{OrderResult, OrderSide};
use crate::order_core::executor::OrderExecutor;
use crate::order_core::validator::{ensure_positive, ensure_slices};
use crate::utils::{current_timestamp_ms, logging, math::round_quantity};

/// TWAP 실행 계획
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TwapPlan {
  pub symbol: String,
  pub side: OrderSide,
  pub total_quantity: Decimal,
  pub slices: usize,
  #[serde(serialize_with = "serialize_secs")]
  pub interval: Duration,
  /// total / slices 를 거래소 수량 정밀도로 반올림한 값
  pub slice_quantity: Decimal,
}

impl TwapPlan {
  pub fn new(
    symbol: impl Into<String>,
    side: OrderSide,
    total_quantity: Decimal,
    slices: usize,
    interval: Duration,
    precision: u32,
  ) -> Result<Self, TradingError> {
    let total_quantity = ensure_positive("total quantity", total_quantity)?;
    let slices = ensure_slices(slices)?;

    let slice_quantity = round_quantity(total_quantity / Decimal::from(slices), precision);
    if slice_quantity <= Decimal::ZERO {
      return Err(TradingError::InvalidParameter(format!(
        "slice quantity rounds to zero ({} / {} at {} decimals)",
        total_quantity, slices, precision
      )));
    }

    Ok(TwapPlan {
      symbol: symbol.into(),
      side,
      total_quantity,
      slices,
      interval,
      slice_quantity,
    })
  }
}

/// 완료된 TWAP 실행 기록 (제출 순서대로)
#[derive(Debug, Clone, Serialize)]
pub struct TwapExecution {
  pub plan: TwapPlan,
  pub results: Vec<OrderResult>,
  pub started_at: i64,
  pub finished_at: i64,
}

impl TwapExecution {
  /// 거래소가 수락한 수량 합계 (보정 후 수량 기준)
  pub fn executed_quantity(&self) -> Decimal {
    self.results.iter().map(|r| r.orig_qty).sum()
  }
}

fn serialize_secs<S: serde::Serializer>(interval: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_f64(interval.as_secs_f64())
}

/// TWAP 스케줄러 - 슬라이스를 한 번에 하나씩 순차 제출
pub struct TwapScheduler {
  executor: Arc<OrderExecutor>,
  precision: u32,
}

impl TwapScheduler {
  pub fn new(executor: Arc<OrderExecutor>, precision: u32) -> Self {
    TwapScheduler { executor, precision }
  }

  /// 취소 신호 없이 TWAP 실행
  pub async fn run_twap(
    &self,
    symbol: &str,
    side: OrderSide,
    total_quantity: Decimal,
    slices: usize,
    interval: Duration,
  ) -> Result<TwapExecution, TradingError> {
    self.run_twap_with_cancel(symbol, side, total_quantity, slices, interval, &CancelToken::new()).await
  }

  /// TWAP 실행. 슬라이스 실패나 취소 시 남은 슬라이스를 중단하고
  /// 완료된 결과와 원인을 `TwapAborted` 로 반환
  pub async fn run_twap_with_cancel(
    &self,
    symbol: &str,
    side: OrderSide,
    total_quantity: Decimal,
    slices: usize,
    interval: Duration,
    cancel: &CancelToken,
  ) -> Result<TwapExecution, TradingError> {
    let plan = TwapPlan::new(symbol, side, total_quantity, slices, interval, self.precision)
      .map_err(|e| {
        logging::log_error("run_twap", &e);
        e
      })?;
    self.execute(plan, cancel).await
  }

  /// 계획대로 실행
  pub async fn execute(&self, plan: TwapPlan, cancel: &CancelToken) -> Result<TwapExecution, TradingError> {
    logging::log_twap_start(&plan.symbol, plan.side.as_str(), plan.total_quantity, plan.slices, plan.interval.as_secs_f64());

    let started_at = current_timestamp_ms();
    let mut results: Vec<OrderResult> = Vec::with_capacity(plan.slices);

    for i in 0..plan.slices {
      if cancel.is_cancelled() {
        return Err(self.abort(&plan, results, i, TradingError::Cancelled));
      }

      log::info!("TWAP 슬라이스 {}/{} - 수량: {}", i + 1, plan.slices, plan.slice_quantity);
      match self.executor.submit_market(&plan.symbol, plan.side, plan.slice_quantity, false).await {
        Ok(result) => results.push(result),
        Err(e) => return Err(self.abort(&plan, results, i, e)),
      }

      if i + 1 < plan.slices {
        if let Err(e) = cancellable_delay(plan.interval, cancel).await {
          return Err(self.abort(&plan, results, i + 1, e));
        }
      }
    }

    logging::log_twap_end(&plan.symbol, results.len(), plan.slices);
    Ok(TwapExecution {
      plan,
      results,
      started_at,
      finished_at: current_timestamp_ms(),
    })
  }

  fn abort(&self, plan: &TwapPlan, completed: Vec<OrderResult>, failed_slice: usize, source: TradingError) -> TradingError {
    log::warn!(
      "TWAP 중단: {} - 슬라이스 {}/{} - 완료 {} - 원인: {}",
      plan.symbol,
      failed_slice + 1,
      plan.slices,
      completed.len(),
      source
    );
    let err = TradingError::TwapAborted {
      completed,
      failed_slice,
      source: Box::new(source),
    };
    logging::log_error("run_twap", &err);
    err
  }
}
