//! 공용 유틸리티
//!
//! 로깅, 수량 계산, 시간 함수 제공

pub mod logging;
pub mod math;

use chrono::{DateTime, TimeZone, Utc};

/// 현재 시간을 타임스탬프(밀리초)로 반환
pub fn current_timestamp_ms() -> i64 {
  Utc::now().timestamp_millis()
}

/// 타임스탬프(밀리초)를 DateTime<Utc>로 변환
pub fn timestamp_to_datetime(timestamp_ms: i64) -> DateTime<Utc> {
  Utc.timestamp_millis_opt(timestamp_ms).single().unwrap_or_default()
}

/// 타임스탬프(밀리초)를 포맷팅된 문자열로 변환
pub fn format_timestamp(timestamp_ms: i64, format: &str) -> String {
  timestamp_to_datetime(timestamp_ms).format(format).to_string()
}
