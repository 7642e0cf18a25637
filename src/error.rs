/**
* filename : error
* author : HAMA
* date: 2025. 5. 8.
* description: 주문 실행 코어의 오류 분류
**/

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::order::OrderResult;

#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    #[error("Invalid reference price: {0}")]
    InvalidPrice(Decimal),

    #[error("Order rejected{}: {reason}", .code.map(|c| format!(" ({})", c)).unwrap_or_default())]
    OrderRejected { code: Option<i64>, reason: String },

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("TWAP aborted at slice {failed_slice} after {} completed slice(s): {source}", .completed.len())]
    TwapAborted {
        completed: Vec<OrderResult>,
        failed_slice: usize,
        #[source]
        source: Box<TradingError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl TradingError {
    /// TWAP 중단 시 이미 체결된 슬라이스 결과 (그 외에는 빈 슬라이스)
    pub fn partial_results(&self) -> &[OrderResult] {
        match self {
            TradingError::TwapAborted { completed, .. } => completed,
            _ => &[],
        }
    }

    /// 중단을 유발한 근본 오류
    pub fn root_cause(&self) -> &TradingError {
        match self {
            TradingError::TwapAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
