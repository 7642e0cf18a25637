//! 단일 주문 실행 코어: 수량 보정, 주문 제출, 입력 검증

pub mod executor;
pub mod normalizer;
pub mod validator;

pub use executor::OrderExecutor;
pub use normalizer::{compute_adjustment, AdjustmentReason, QuantityAdjustment, QuantityNormalizer};
