use rust_decimal::Decimal;

use crate::error::TradingError;
use crate::models::order::OrderSide;

/// 주문 방향 검증 (BUY / SELL, 대소문자 무시)
pub fn parse_side(raw: &str) -> Result<OrderSide, TradingError> {
    raw.parse()
}

/// 심볼 검증 - 비어 있지 않은 영숫자, 대문자로 정규화
pub fn parse_symbol(raw: &str) -> Result<String, TradingError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(TradingError::InvalidParameter(format!("invalid symbol '{}'", raw)));
    }
    Ok(symbol)
}

/// 양수 값 검증
pub fn ensure_positive(name: &str, value: Decimal) -> Result<Decimal, TradingError> {
    if value <= Decimal::ZERO {
        return Err(TradingError::InvalidParameter(format!("{} must be positive, got {}", name, value)));
    }
    Ok(value)
}

/// 문자열 수치를 양수 Decimal 로 파싱
pub fn parse_positive(name: &str, raw: &str) -> Result<Decimal, TradingError> {
    let trimmed = raw.trim();
    let value = trimmed
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| TradingError::InvalidParameter(format!("{} is not a number: '{}'", name, raw)))?;
    ensure_positive(name, value)
}

/// TWAP 분할 수 검증
pub fn ensure_slices(slices: usize) -> Result<usize, TradingError> {
    if slices == 0 {
        return Err(TradingError::InvalidParameter("slices must be at least 1".to_string()));
    }
    Ok(slices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("qty", "0.002").unwrap(), dec!(0.002));
        assert_eq!(parse_positive("qty", "1e-3").unwrap(), dec!(0.001));
        assert!(parse_positive("qty", "0").is_err());
        assert!(parse_positive("qty", "-5").is_err());
        assert!(parse_positive("qty", "abc").is_err());
    }

    #[test]
    fn test_symbol_and_side() {
        assert_eq!(parse_symbol(" btcusdt ").unwrap(), "BTCUSDT");
        assert!(parse_symbol("BTC/USDT").is_err());
        assert_eq!(parse_side("sell").unwrap(), OrderSide::Sell);
        assert!(parse_side("long").is_err());
    }

    #[test]
    fn test_ensure_slices() {
        assert!(ensure_slices(0).is_err());
        assert_eq!(ensure_slices(5).unwrap(), 5);
    }
}
