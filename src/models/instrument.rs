use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 심볼별 거래 필터 (매 호출마다 새로 조회, 캐시하지 않음)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentFilters {
    pub symbol: String,
    /// 최소 주문 명목가 (price × quantity). 없으면 설정의 기본값 사용
    pub min_notional: Option<Decimal>,
    /// 수량 단위. 없으면 반올림 제약 없음
    pub step_size: Option<Decimal>,
}

impl InstrumentFilters {
    pub fn new(symbol: impl Into<String>) -> Self {
        InstrumentFilters {
            symbol: symbol.into(),
            min_notional: None,
            step_size: None,
        }
    }

    pub fn with_min_notional(mut self, min_notional: Decimal) -> Self {
        self.min_notional = Some(min_notional);
        self
    }

    pub fn with_step_size(mut self, step_size: Decimal) -> Self {
        self.step_size = if step_size > Decimal::ZERO { Some(step_size) } else { None };
        self
    }

    pub fn effective_min_notional(&self, fallback: Decimal) -> Decimal {
        self.min_notional.unwrap_or(fallback)
    }
}
