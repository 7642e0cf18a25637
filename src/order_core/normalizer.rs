/**
* filename : normalizer
* author : HAMA
* date: 2025. 5. 8.
* description: 최소 명목가(minNotional) 기준 주문 수량 보정
**/

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::TradingError;
use crate::exchange::traits::ExchangeClient;
use crate::models::instrument::InstrumentFilters;
use crate::utils::math::ceil_to_step;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum AdjustmentReason {
    /// 명목가가 이미 최소값 이상
    WithinMinNotional,
    /// 최소 명목가를 맞추기 위해 수량 증가
    RaisedToMinNotional,
}

/// 수량 보정 결과 기록 (원본, 보정값, 사유)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuantityAdjustment {
    pub original: Decimal,
    pub adjusted: Decimal,
    pub reference_price: Decimal,
    pub min_notional: Decimal,
    /// 원본 수량 기준 명목가
    pub notional: Decimal,
    pub reason: AdjustmentReason,
}

impl QuantityAdjustment {
    pub fn was_adjusted(&self) -> bool {
        self.reason == AdjustmentReason::RaisedToMinNotional
    }
}

/// 필터와 기준가로 거래소 규칙에 맞는 수량 계산 (부수 효과 없음)
///
/// 수량은 늘어나기만 하고 줄어들지 않는다. step 이 있으면 step 단위로, 없으면
/// `precision` 자릿수 단위로 올림.
pub fn compute_adjustment(
    filters: &InstrumentFilters,
    quantity: Decimal,
    reference_price: Decimal,
    default_min_notional: Decimal,
    precision: u32,
) -> Result<QuantityAdjustment, TradingError> {
    if reference_price <= Decimal::ZERO {
        return Err(TradingError::InvalidPrice(reference_price));
    }
    if quantity <= Decimal::ZERO {
        return Err(TradingError::InvalidParameter(format!("quantity must be positive, got {}", quantity)));
    }

    let min_notional = filters.effective_min_notional(default_min_notional);
    let notional = notional_of(quantity, reference_price)?;

    if notional >= min_notional {
        return Ok(QuantityAdjustment {
            original: quantity,
            adjusted: quantity,
            reference_price,
            min_notional,
            notional,
            reason: AdjustmentReason::WithinMinNotional,
        });
    }

    let step = filters.step_size.unwrap_or_else(|| Decimal::new(1, precision.min(MAX_SCALE)));
    let required = min_notional
        .checked_div(reference_price)
        .ok_or(TradingError::InvalidPrice(reference_price))?;
    let mut adjusted = ceil_to_step(required, step).ok_or_else(|| out_of_range(required, reference_price))?;

    // 나눗셈 결과가 28자리에서 잘리면 한 step 모자랄 수 있음
    while notional_of(adjusted, reference_price)? < min_notional {
        adjusted = adjusted.checked_add(step).ok_or_else(|| out_of_range(adjusted, reference_price))?;
    }

    Ok(QuantityAdjustment {
        original: quantity,
        adjusted: adjusted.max(quantity),
        reference_price,
        min_notional,
        notional,
        reason: AdjustmentReason::RaisedToMinNotional,
    })
}

const MAX_SCALE: u32 = 28;

fn notional_of(quantity: Decimal, price: Decimal) -> Result<Decimal, TradingError> {
    quantity.checked_mul(price).ok_or_else(|| out_of_range(quantity, price))
}

fn out_of_range(quantity: Decimal, price: Decimal) -> TradingError {
    TradingError::InvalidParameter(format!("quantity {} at price {} is out of range", quantity, price))
}

/// 거래소에서 필터/시세를 조회해 수량을 보정
pub struct QuantityNormalizer {
    client: Arc<dyn ExchangeClient>,
    default_min_notional: Decimal,
    precision: u32,
}

impl QuantityNormalizer {
    pub fn new(client: Arc<dyn ExchangeClient>, default_min_notional: Decimal, precision: u32) -> Self {
        QuantityNormalizer { client, default_min_notional, precision }
    }

    /// 지정가가 있으면 그 가격을, 없으면 현재 마크 가격을 기준가로 사용
    pub async fn normalize(
        &self,
        symbol: &str,
        quantity: Decimal,
        limit_price: Option<Decimal>,
    ) -> Result<QuantityAdjustment, TradingError> {
        let filters = self.client.fetch_instrument_filters(symbol).await?;

        let reference_price = match limit_price {
            Some(price) => price,
            None => self.client.fetch_mark_price(symbol).await?,
        };

        compute_adjustment(&filters, quantity, reference_price, self.default_min_notional, self.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::in_memory::InMemoryExchange;
    use crate::exchange::traits::MockExchangeClient;
    use crate::utils::math::is_step_multiple;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn btc_filters() -> InstrumentFilters {
        InstrumentFilters::new("BTCUSDT").with_min_notional(dec!(100)).with_step_size(dec!(0.001))
    }

    #[rstest]
    #[case(dec!(0.002), dec!(60000))]
    #[case(dec!(1), dec!(100))]
    #[case(dec!(0.0017), dec!(60000))]
    #[case(dec!(10), dec!(10.5))]
    fn test_quantity_unchanged_when_notional_sufficient(#[case] quantity: Decimal, #[case] price: Decimal) {
        let adj = compute_adjustment(&btc_filters(), quantity, price, dec!(100), 8).unwrap();
        assert_eq!(adj.adjusted, quantity);
        assert!(!adj.was_adjusted());
    }

    #[rstest]
    #[case(dec!(0.001), dec!(60000), dec!(0.002))]
    #[case(dec!(0.0001), dec!(30000), dec!(0.004))]
    #[case(dec!(0.5), dec!(150), dec!(0.667))]
    #[case(dec!(0.0015), dec!(50000), dec!(0.002))]
    fn test_quantity_raised_to_step_grid(#[case] quantity: Decimal, #[case] price: Decimal, #[case] expected: Decimal) {
        let adj = compute_adjustment(&btc_filters(), quantity, price, dec!(100), 8).unwrap();
        assert_eq!(adj.adjusted, expected);
        assert!(adj.was_adjusted());
        assert!(adj.adjusted * price >= dec!(100));
        assert!(adj.adjusted >= quantity);
        assert!(is_step_multiple(adj.adjusted, dec!(0.001)));
        // 한 step 작으면 최소 명목가 미달이어야 함 (항상 올림)
        assert!((adj.adjusted - dec!(0.001)) * price < dec!(100));
    }

    #[test]
    fn test_without_step_size_uses_exact_requirement() {
        let filters = InstrumentFilters::new("ETHUSDT").with_min_notional(dec!(20));
        let adj = compute_adjustment(&filters, dec!(0.001), dec!(3200), dec!(100), 8).unwrap();
        assert_eq!(adj.adjusted, dec!(0.00625));
        assert!(adj.adjusted * dec!(3200) >= dec!(20));
    }

    #[rstest]
    #[case(dec!(260.3))]
    #[case(dec!(3.7))]
    #[case(dec!(7))]
    #[case(dec!(61234.57))]
    fn test_without_step_size_rounds_up_to_precision(#[case] price: Decimal) {
        let filters = InstrumentFilters::new("ALTUSDT").with_min_notional(dec!(100));
        let adj = compute_adjustment(&filters, dec!(0.0001), price, dec!(100), 8).unwrap();
        assert!(adj.adjusted * price >= dec!(100));
        assert!(adj.adjusted.scale() <= 8);
        assert!((adj.adjusted - dec!(0.00000001)) * price < dec!(100));
    }

    #[test]
    fn test_without_step_size_sweep_meets_min_notional() {
        let filters = InstrumentFilters::new("ALTUSDT").with_min_notional(dec!(100));
        for cents in (100..500_000).step_by(37) {
            let price = Decimal::new(cents, 2);
            let adj = compute_adjustment(&filters, dec!(0.00000001), price, dec!(100), 8).unwrap();
            assert!(adj.adjusted * price >= dec!(100), "price {} -> {}", price, adj.adjusted);
        }
    }

    #[test]
    fn test_extreme_values_return_errors() {
        let huge_qty = Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0);
        let err = compute_adjustment(&btc_filters(), huge_qty, Decimal::from(10_000_000_000i64), dec!(100), 8).unwrap_err();
        assert!(matches!(err, TradingError::InvalidParameter(_)));

        let tiny = Decimal::new(1, 28);
        let err = compute_adjustment(&btc_filters(), tiny, tiny, dec!(100), 8).unwrap_err();
        assert!(matches!(err, TradingError::InvalidPrice(p) if p == tiny));
    }

    #[test]
    fn test_missing_min_notional_falls_back_to_default() {
        let filters = InstrumentFilters::new("ETHUSDT").with_step_size(dec!(0.001));
        let adj = compute_adjustment(&filters, dec!(0.01), dec!(3000), dec!(100), 8).unwrap();
        assert_eq!(adj.min_notional, dec!(100));
        assert_eq!(adj.adjusted, dec!(0.034));

        let adj = compute_adjustment(&filters, dec!(0.01), dec!(3000), dec!(5), 8).unwrap();
        assert_eq!(adj.adjusted, dec!(0.01));
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-1))]
    fn test_non_positive_price_is_invalid(#[case] price: Decimal) {
        let err = compute_adjustment(&btc_filters(), dec!(1), price, dec!(100), 8).unwrap_err();
        assert!(matches!(err, TradingError::InvalidPrice(p) if p == price));
    }

    #[tokio::test]
    async fn test_limit_price_skips_mark_price_fetch() {
        let exchange = Arc::new(InMemoryExchange::with_default_instruments());
        let normalizer = QuantityNormalizer::new(exchange.clone(), dec!(100), 8);

        let adj = normalizer.normalize("BTCUSDT", dec!(0.001), Some(dec!(50000))).await.unwrap();
        assert_eq!(adj.reference_price, dec!(50000));
        assert_eq!(adj.adjusted, dec!(0.002));
        assert_eq!(exchange.mark_price_fetch_count().await, 0);

        let adj = normalizer.normalize("BTCUSDT", dec!(0.001), None).await.unwrap();
        assert_eq!(adj.reference_price, dec!(60000));
        assert_eq!(exchange.mark_price_fetch_count().await, 1);
    }

    #[tokio::test]
    async fn test_filters_fetched_on_every_call() {
        let exchange = Arc::new(InMemoryExchange::with_default_instruments());
        let normalizer = QuantityNormalizer::new(exchange.clone(), dec!(100), 8);

        normalizer.normalize("ETHUSDT", dec!(0.001), None).await.unwrap();
        normalizer.normalize("ETHUSDT", dec!(0.001), Some(dec!(2900))).await.unwrap();
        assert_eq!(exchange.filter_fetch_count().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_symbol_never_touches_orders() {
        let mut client = MockExchangeClient::new();
        client
            .expect_fetch_instrument_filters()
            .withf(|symbol| symbol == "XYZUSD")
            .times(1)
            .returning(|symbol| Err(TradingError::InstrumentNotFound(symbol.to_string())));
        client.expect_fetch_mark_price().never();
        client.expect_create_order().never();

        let normalizer = QuantityNormalizer::new(Arc::new(client), dec!(100), 8);
        let err = normalizer.normalize("XYZUSD", dec!(1), None).await.unwrap_err();
        assert!(matches!(err, TradingError::InstrumentNotFound(s) if s == "XYZUSD"));
    }
}
