//! 로깅 유틸리티
//!
//! 로그 초기화 및 주문 실행 로그 함수 제공

use env_logger::Builder;
use log::LevelFilter;
use rust_decimal::Decimal;
use std::env;

use crate::error::TradingError;
use crate::models::order::{OrderRequest, OrderResult};
use crate::order_core::normalizer::QuantityAdjustment;

/// 로깅 시스템 초기화
///
/// RUST_LOG 가 설정되어 있으면 그 값을, 없으면 설정 파일의 레벨을 사용
pub fn init(default_level: &str) -> Result<(), TradingError> {
    let mut builder = Builder::from_default_env();

    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());

    let level_filter = match log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };

    builder
      .filter_level(level_filter)
      .format_timestamp_millis()
      .try_init()
      .map_err(|e| TradingError::ConfigError(format!("logger already initialised: {}", e)))?;

    log::info!("로깅 시스템 초기화 완료: 레벨 = {}", log_level);

    Ok(())
}

/// 주문 제출 시도 로그
pub fn log_order_submission(operation: &str, order: &OrderRequest) {
    log::info!(
        "{}: 주문 제출 - 심볼: {} - 방향: {} - 타입: {} - 수량: {} - 가격: {} - 트리거: {} - reduceOnly: {}",
        operation,
        order.symbol,
        order.side,
        order.kind.wire_name(),
        order.quantity,
        display_opt(order.price),
        display_opt(order.stop_price),
        order.reduce_only,
    );
}

/// 주문 응답 로그
pub fn log_order_response(operation: &str, result: &OrderResult) {
    log::info!(
        "{}: 주문 응답 - ID: {} - 심볼: {} - 상태: {:?} - 수량: {} - 체결: {} - 가격: {}",
        operation,
        result.order_id,
        result.symbol,
        result.status,
        result.orig_qty,
        result.executed_qty,
        result.price,
    );
}

/// 수량 조정 로그 (조정이 없으면 debug 레벨)
pub fn log_quantity_adjustment(symbol: &str, adjustment: &QuantityAdjustment) {
    if adjustment.was_adjusted() {
        log::info!(
            "최소 명목가 미달 ({} < {}) - 심볼: {} - 수량 조정 {} -> {} (기준가 {})",
            adjustment.notional,
            adjustment.min_notional,
            symbol,
            adjustment.original,
            adjustment.adjusted,
            adjustment.reference_price,
        );
    } else {
        log::debug!(
            "수량 조정 불필요 - 심볼: {} - 수량: {} - 명목가: {} >= {}",
            symbol,
            adjustment.original,
            adjustment.notional,
            adjustment.min_notional,
        );
    }
}

/// TWAP 시작 로그
pub fn log_twap_start(symbol: &str, side: &str, total: Decimal, slices: usize, interval_secs: f64) {
    log::info!(
        "TWAP 시작: {} {} - 총 수량: {} - 분할: {} - 간격: {}s",
        symbol, side, total, slices, interval_secs
    );
}

/// TWAP 종료 로그
pub fn log_twap_end(symbol: &str, completed: usize, slices: usize) {
    log::info!("TWAP 종료: {} - 완료 슬라이스: {}/{}", symbol, completed, slices);
}

/// 오류 로그
pub fn log_error(context: &str, error: &TradingError) {
    log::error!("오류 발생 - {}: {}", context, error);
}

fn display_opt(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
