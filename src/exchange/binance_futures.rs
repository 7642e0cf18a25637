use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;

use crate::config::ExchangeConfig;
use crate::error::TradingError;
use crate::exchange::traits::ExchangeClient;
use crate::models::instrument::InstrumentFilters;
use crate::models::order::{
  OrderId, OrderKind, OrderLookup, OrderRequest, OrderResult, OrderSide, OrderStatus, TimeInForce,
};
use crate::utils::current_timestamp_ms;

type HmacSha256 = Hmac<Sha256>;

/// Exchange error code for an unknown order
const ORDER_DOES_NOT_EXIST: i64 = -2013;

/// Binance USDT-M Futures REST connector
pub struct BinanceFuturesClient {
  base_url: String,
  api_key: String,
  api_secret: String,
  recv_window_ms: u64,
  http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
  symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
  symbol: String,
  #[serde(default)]
  filters: Vec<RawFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum RawFilter {
  #[serde(rename = "MIN_NOTIONAL")]
  MinNotional { notional: Decimal },
  #[serde(rename = "LOT_SIZE")]
  LotSize {
    #[serde(rename = "stepSize")]
    step_size: Decimal,
  },
  #[serde(other)]
  Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkPrice {
  mark_price: Decimal,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
  code: i64,
  msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
  order_id: i64,
  client_order_id: Option<String>,
  symbol: String,
  side: OrderSide,
  #[serde(rename = "type")]
  order_type: String,
  status: String,
  orig_qty: Decimal,
  executed_qty: Decimal,
  price: Decimal,
  #[serde(default)]
  avg_price: Decimal,
  stop_price: Option<Decimal>,
  time_in_force: Option<TimeInForce>,
  #[serde(default)]
  reduce_only: bool,
  update_time: i64,
}

impl OrderResponse {
  fn into_result(self) -> Result<OrderResult, TradingError> {
    let kind = OrderKind::from_wire(&self.order_type)
      .ok_or_else(|| TradingError::TransportError(format!("unexpected order type in response: {}", self.order_type)))?;
    let status = self.status.parse::<OrderStatus>()
      .map_err(|_| TradingError::TransportError(format!("unexpected order status in response: {}", self.status)))?;
    Ok(OrderResult {
      order_id: OrderId(self.order_id.to_string()),
      client_order_id: self.client_order_id,
      symbol: self.symbol,
      side: self.side,
      kind,
      status,
      orig_qty: self.orig_qty,
      executed_qty: self.executed_qty,
      price: self.price,
      avg_price: self.avg_price,
      stop_price: self.stop_price.filter(|p| !p.is_zero()),
      time_in_force: if kind == OrderKind::Market { None } else { self.time_in_force },
      reduce_only: self.reduce_only,
      update_time: self.update_time,
    })
  }
}

impl BinanceFuturesClient {
  pub fn new(
    base_url: impl Into<String>,
    api_key: impl Into<String>,
    api_secret: impl Into<String>,
    recv_window_ms: u64,
    timeout: Duration,
  ) -> Result<Self, TradingError> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| TradingError::ConfigError(format!("failed to build http client: {}", e)))?;
    let base_url: String = base_url.into();
    Ok(BinanceFuturesClient {
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: api_key.into(),
      api_secret: api_secret.into(),
      recv_window_ms,
      http,
    })
  }

  /// Build a connector from configuration (credentials required)
  pub fn from_config(config: &ExchangeConfig) -> Result<Self, TradingError> {
    let (api_key, api_secret) = config.credentials()?;
    log::info!("Binance futures connector: {} (testnet={})", config.endpoint(), config.testnet);
    Self::new(
      config.endpoint(),
      api_key,
      api_secret,
      config.recv_window_ms,
      Duration::from_millis(config.timeout_ms),
    )
  }

  fn sign(&self, query: &str) -> Result<String, TradingError> {
    let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
      .map_err(|e| TradingError::ConfigError(format!("invalid api secret: {}", e)))?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
  }

  fn signed_query(&self, mut params: Vec<(&'static str, String)>) -> Result<String, TradingError> {
    params.push(("recvWindow", self.recv_window_ms.to_string()));
    params.push(("timestamp", current_timestamp_ms().to_string()));
    let query = encode_params(&params);
    let signature = self.sign(&query)?;
    Ok(format!("{}&signature={}", query, signature))
  }

  async fn public_get<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &str) -> Result<T, TradingError> {
    let url = if query.is_empty() {
      format!("{}{}", self.base_url, path)
    } else {
      format!("{}{}?{}", self.base_url, path, query)
    };
    let res = self.http.get(url)
      .send().await
      .map_err(|e| TradingError::TransportError(format!("GET {} http error: {}", path, e)))?;
    Self::decode(path, res).await
  }

  async fn decode<T: for<'de> Deserialize<'de>>(path: &str, res: reqwest::Response) -> Result<T, TradingError> {
    let status = res.status();
    let body = res.text().await
      .map_err(|e| TradingError::TransportError(format!("{} read error: {}", path, e)))?;
    if !status.is_success() {
      return Err(classify_failure(status, &body));
    }
    serde_json::from_str(&body)
      .map_err(|e| TradingError::TransportError(format!("{} parse error: {}", path, e)))
  }
}

/// Map a non-success HTTP response to the error taxonomy
fn classify_failure(status: StatusCode, body: &str) -> TradingError {
  let api_error = serde_json::from_str::<ApiErrorBody>(body).ok();
  let transport = status.is_server_error()
    || status == StatusCode::UNAUTHORIZED
    || status == StatusCode::FORBIDDEN
    || status == StatusCode::REQUEST_TIMEOUT
    || status == StatusCode::TOO_MANY_REQUESTS;

  match api_error {
    Some(err) if err.code == ORDER_DOES_NOT_EXIST => TradingError::OrderNotFound(err.msg),
    Some(err) if !transport => TradingError::OrderRejected { code: Some(err.code), reason: err.msg },
    Some(err) => TradingError::TransportError(format!("{} ({}): {}", status, err.code, err.msg)),
    None if transport || !status.is_client_error() => TradingError::TransportError(format!("{}: {}", status, body)),
    None => TradingError::OrderRejected { code: None, reason: format!("{}: {}", status, body) },
  }
}

fn encode_params(params: &[(&str, String)]) -> String {
  params.iter()
    .map(|(k, v)| format!("{}={}", k, v))
    .collect::<Vec<_>>()
    .join("&")
}

/// Order parameters in the exchange's wire format
fn order_params(order: &OrderRequest) -> Vec<(&'static str, String)> {
  let mut params = vec![
    ("symbol", order.symbol.clone()),
    ("side", order.side.as_str().to_string()),
    ("type", order.kind.wire_name().to_string()),
    ("quantity", order.quantity.normalize().to_string()),
  ];
  if let Some(price) = order.price {
    params.push(("price", price.normalize().to_string()));
  }
  if let Some(stop_price) = order.stop_price {
    params.push(("stopPrice", stop_price.normalize().to_string()));
  }
  if let Some(tif) = order.time_in_force {
    params.push(("timeInForce", tif.as_str().to_string()));
  }
  if order.reduce_only {
    params.push(("reduceOnly", "true".to_string()));
  }
  params.push(("newClientOrderId", order.client_order_id.clone()));
  params
}

fn parse_filters(info: ExchangeInfo, symbol: &str) -> Result<InstrumentFilters, TradingError> {
  let entry = info.symbols.into_iter()
    .find(|s| s.symbol == symbol)
    .ok_or_else(|| TradingError::InstrumentNotFound(symbol.to_string()))?;

  let mut filters = InstrumentFilters::new(entry.symbol);
  for f in entry.filters {
    match f {
      RawFilter::MinNotional { notional } => filters = filters.with_min_notional(notional),
      RawFilter::LotSize { step_size } => filters = filters.with_step_size(step_size),
      RawFilter::Other => {}
    }
  }
  Ok(filters)
}

#[async_trait]
impl ExchangeClient for BinanceFuturesClient {
  async fn fetch_instrument_filters(&self, symbol: &str) -> Result<InstrumentFilters, TradingError> {
    let info: ExchangeInfo = self.public_get("/fapi/v1/exchangeInfo", "").await?;
    parse_filters(info, symbol)
  }

  async fn fetch_mark_price(&self, symbol: &str) -> Result<Decimal, TradingError> {
    let mark: MarkPrice = self.public_get("/fapi/v1/premiumIndex", &format!("symbol={}", symbol)).await?;
    Ok(mark.mark_price)
  }

  async fn create_order(&self, order: &OrderRequest) -> Result<OrderResult, TradingError> {
    let query = self.signed_query(order_params(order))?;
    let url = format!("{}/fapi/v1/order?{}", self.base_url, query);
    let res = self.http
      .post(url)
      .header("X-MBX-APIKEY", &self.api_key)
      .send().await
      .map_err(|e| TradingError::TransportError(format!("create_order http error: {}", e)))?;
    let response: OrderResponse = Self::decode("/fapi/v1/order", res).await?;
    response.into_result()
  }

  async fn fetch_order_status(&self, symbol: &str, lookup: &OrderLookup) -> Result<OrderResult, TradingError> {
    let mut params = vec![("symbol", symbol.to_string())];
    match lookup {
      OrderLookup::OrderId(id) => params.push(("orderId", id.0.clone())),
      OrderLookup::ClientOrderId(id) => params.push(("origClientOrderId", id.clone())),
    }
    let query = self.signed_query(params)?;
    let url = format!("{}/fapi/v1/order?{}", self.base_url, query);
    let res = self.http
      .get(url)
      .header("X-MBX-APIKEY", &self.api_key)
      .send().await
      .map_err(|e| TradingError::TransportError(format!("fetch_order_status http error: {}", e)))?;
    let response: OrderResponse = Self::decode("/fapi/v1/order", res).await?;
    response.into_result()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  const EXCHANGE_INFO: &str = r#"{
    "timezone": "UTC",
    "symbols": [
      {
        "symbol": "BTCUSDT",
        "status": "TRADING",
        "filters": [
          {"filterType": "PRICE_FILTER", "minPrice": "261.10", "maxPrice": "809484", "tickSize": "0.10"},
          {"filterType": "LOT_SIZE", "stepSize": "0.001", "maxQty": "1000", "minQty": "0.001"},
          {"filterType": "MIN_NOTIONAL", "notional": "100"}
        ]
      },
      {
        "symbol": "ETHUSDT",
        "filters": [
          {"filterType": "LOT_SIZE", "stepSize": "0.001", "maxQty": "10000", "minQty": "0.001"}
        ]
      }
    ]
  }"#;

  fn client() -> BinanceFuturesClient {
    BinanceFuturesClient::new("http://localhost/", "key", "secret", 5000, Duration::from_secs(1)).unwrap()
  }

  #[test]
  fn test_parse_filters() {
    let info: ExchangeInfo = serde_json::from_str(EXCHANGE_INFO).unwrap();
    let filters = parse_filters(info, "BTCUSDT").unwrap();
    assert_eq!(filters.min_notional, Some(dec!(100)));
    assert_eq!(filters.step_size, Some(dec!(0.001)));
  }

  #[test]
  fn test_parse_filters_without_min_notional() {
    let info: ExchangeInfo = serde_json::from_str(EXCHANGE_INFO).unwrap();
    let filters = parse_filters(info, "ETHUSDT").unwrap();
    assert_eq!(filters.min_notional, None);
  }

  #[test]
  fn test_parse_filters_unknown_symbol() {
    let info: ExchangeInfo = serde_json::from_str(EXCHANGE_INFO).unwrap();
    let err = parse_filters(info, "XYZUSD").unwrap_err();
    assert!(matches!(err, TradingError::InstrumentNotFound(s) if s == "XYZUSD"));
  }

  #[test]
  fn test_stop_limit_params_carry_both_prices() {
    let order = OrderRequest::stop_limit("BTCUSDT", OrderSide::Buy, dec!(0.0020), dec!(61000.50), dec!(61010.00))
      .with_client_order_id("abc");
    let query = encode_params(&order_params(&order));
    assert_eq!(
      query,
      "symbol=BTCUSDT&side=BUY&type=STOP&quantity=0.002&price=61010&stopPrice=61000.5&timeInForce=GTC&newClientOrderId=abc"
    );
  }

  #[test]
  fn test_market_params_reduce_only() {
    let order = OrderRequest::market("BTCUSDT", OrderSide::Sell, dec!(0.5))
      .with_reduce_only(true)
      .with_client_order_id("x1");
    let query = encode_params(&order_params(&order));
    assert_eq!(query, "symbol=BTCUSDT&side=SELL&type=MARKET&quantity=0.5&reduceOnly=true&newClientOrderId=x1");
  }

  #[test]
  fn test_signature_is_hex_sha256() {
    let sig = client().sign("symbol=BTCUSDT&timestamp=1").unwrap();
    assert_eq!(sig.len(), 64);
    assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
  }

  #[test]
  fn test_classify_failure() {
    let rejected = classify_failure(StatusCode::BAD_REQUEST, r#"{"code":-2019,"msg":"Margin is insufficient."}"#);
    assert!(matches!(rejected, TradingError::OrderRejected { code: Some(-2019), .. }));

    let missing = classify_failure(StatusCode::BAD_REQUEST, r#"{"code":-2013,"msg":"Order does not exist."}"#);
    assert!(matches!(missing, TradingError::OrderNotFound(_)));

    let auth = classify_failure(StatusCode::UNAUTHORIZED, r#"{"code":-2015,"msg":"Invalid API-key"}"#);
    assert!(matches!(auth, TradingError::TransportError(_)));

    let server = classify_failure(StatusCode::BAD_GATEWAY, "<html>");
    assert!(matches!(server, TradingError::TransportError(_)));
  }

  #[test]
  fn test_order_response_into_result() {
    let body = r#"{
      "orderId": 4059893178, "clientOrderId": "abc", "symbol": "BTCUSDT", "side": "BUY",
      "type": "STOP", "status": "NEW", "origQty": "0.002", "executedQty": "0", "price": "61010",
      "avgPrice": "0.00", "stopPrice": "61000.5", "timeInForce": "GTC", "reduceOnly": false,
      "updateTime": 1700000000000
    }"#;
    let response: OrderResponse = serde_json::from_str(body).unwrap();
    let result = response.into_result().unwrap();
    assert_eq!(result.order_id, OrderId("4059893178".to_string()));
    assert_eq!(result.kind, OrderKind::StopLimit);
    assert_eq!(result.status, OrderStatus::New);
    assert_eq!(result.stop_price, Some(dec!(61000.5)));
    assert_eq!(result.time_in_force, Some(TimeInForce::Gtc));
  }
}
