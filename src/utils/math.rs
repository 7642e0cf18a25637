//! 수량 계산 유틸리티
//!
//! 거래소 단위(step) 기준의 올림/반올림 함수 제공

use rust_decimal::{Decimal, RoundingStrategy};

/// 수량을 step 의 배수로 올림 (최소 요구 수량을 밑돌지 않도록). 범위를 넘으면 None
pub fn ceil_to_step(quantity: Decimal, step_size: Decimal) -> Option<Decimal> {
  if step_size <= Decimal::ZERO {
    return Some(quantity);
  }
  quantity.checked_div(step_size)?.ceil().checked_mul(step_size)
}

/// 소수 자릿수 기준 반올림 (중간값은 짝수 쪽)
pub fn round_quantity(quantity: Decimal, precision: u32) -> Decimal {
  quantity.round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven)
}

/// step 의 배수인지 확인
pub fn is_step_multiple(quantity: Decimal, step_size: Decimal) -> bool {
  step_size <= Decimal::ZERO || (quantity % step_size).is_zero()
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn test_ceil_to_step() {
    assert_eq!(ceil_to_step(dec!(0.0016667), dec!(0.001)), Some(dec!(0.002)));
    assert_eq!(ceil_to_step(dec!(0.002), dec!(0.001)), Some(dec!(0.002)));
    assert_eq!(ceil_to_step(dec!(3.2), dec!(1)), Some(dec!(4)));
    assert_eq!(ceil_to_step(dec!(3.2), dec!(0)), Some(dec!(3.2)));
  }

  #[test]
  fn test_ceil_to_step_out_of_range() {
    assert_eq!(ceil_to_step(Decimal::MAX, dec!(0.001)), None);
  }

  #[test]
  fn test_round_quantity() {
    assert_eq!(round_quantity(dec!(10) / dec!(3), 8), dec!(3.33333333));
    assert_eq!(round_quantity(dec!(0.000000025), 8), dec!(0.00000002));
  }

  #[test]
  fn test_is_step_multiple() {
    assert!(is_step_multiple(dec!(0.003), dec!(0.001)));
    assert!(!is_step_multiple(dec!(0.0035), dec!(0.001)));
    assert!(is_step_multiple(dec!(0.0035), dec!(0)));
  }
}
