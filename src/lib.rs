//! 선물 주문 실행 라이브러리
//!
//! 최소 명목가 기준 수량 보정, 단일 주문 제출, TWAP 분할 실행을 제공합니다.

pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod exchange;
pub mod models;
pub mod order_core;
pub mod utils;

// 핵심 타입 재노출
pub use crate::error::TradingError;
pub use crate::models::instrument::InstrumentFilters;
pub use crate::models::order::{OrderId, OrderKind, OrderLookup, OrderRequest, OrderResult, OrderSide, OrderStatus, TimeInForce};
pub use crate::exchange::traits::ExchangeClient;
pub use crate::order_core::{OrderExecutor, QuantityAdjustment, QuantityNormalizer};
pub use crate::core::{CancelToken, TwapExecution, TwapPlan, TwapScheduler};

/// 버전 정보
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 결과 타입 별칭
pub type Result<T> = std::result::Result<T, TradingError>;
