/**
* filename : config
* author : HAMA
* date: 2025. 5. 8.
* description:
**/

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::TradingError;
use crate::models::order::TimeInForce;

pub const TESTNET_BASE_URL: &str = "https://testnet.binancefuture.com";
pub const LIVE_BASE_URL: &str = "https://fapi.binance.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub testnet: bool,
    pub base_url: Option<String>,
    pub recv_window_ms: u64,
    pub timeout_ms: u64,
    pub use_mock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// 거래소 필터에 MIN_NOTIONAL 이 없을 때 사용하는 보수적 기본값
    pub default_min_notional: Decimal,
    /// TWAP 슬라이스 수량 소수 자릿수
    pub quantity_precision: u32,
    pub default_time_in_force: TimeInForce,
    pub twap_default_slices: usize,
    pub twap_default_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl ExchangeConfig {
    /// 명시적 base_url 이 없으면 testnet 여부로 엔드포인트 선택
    pub fn endpoint(&self) -> &str {
        match &self.base_url {
            Some(url) => url.as_str(),
            None if self.testnet => TESTNET_BASE_URL,
            None => LIVE_BASE_URL,
        }
    }

    pub fn credentials(&self) -> Result<(&str, &str), TradingError> {
        match (self.api_key.as_deref(), self.api_secret.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => Ok((key, secret)),
            _ => Err(TradingError::ConfigError(
                "API credentials not provided (set BINANCE_API_KEY / BINANCE_API_SECRET)".to_string(),
            )),
        }
    }

    /// 명령줄 자격 증명은 설정 파일과 환경 변수보다 우선
    pub fn override_credentials(&mut self, api_key: Option<String>, api_secret: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(secret) = api_secret.filter(|s| !s.is_empty()) {
            self.api_secret = Some(secret);
        }
    }
}

impl Config {
    /// Load configuration from config.json in the working directory, falling back to defaults
    pub fn load() -> Result<Self, TradingError> {
        let config_path = Path::new("config.json");

        let mut cfg = if config_path.exists() {
            Self::read_file(config_path)?
        } else {
            Config::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, TradingError> {
        let mut cfg = Self::read_file(path.as_ref())?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn read_file(path: &Path) -> Result<Self, TradingError> {
        let mut file = File::open(path)
            .map_err(|e| TradingError::ConfigError(format!("Failed to open config file: {}", e)))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| TradingError::ConfigError(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| TradingError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Apply environment variable overrides for sensitive/runtime fields
    fn apply_env_overrides(&mut self) {
        use std::env;
        if let Ok(v) = env::var("BINANCE_API_KEY") { if !v.is_empty() { self.exchange.api_key = Some(v); } }
        if let Ok(v) = env::var("BINANCE_API_SECRET") { if !v.is_empty() { self.exchange.api_secret = Some(v); } }
        if let Ok(v) = env::var("BINANCE_BASE_URL") { if !v.is_empty() { self.exchange.base_url = Some(v); } }
        if let Some(flag) = env::var("BINANCE_TESTNET").ok().and_then(|v| parse_flag(&v)) { self.exchange.testnet = flag; }
        if let Some(flag) = env::var("USE_MOCK").ok().and_then(|v| parse_flag(&v)) { self.exchange.use_mock = flag; }
        if let Ok(v) = env::var("MIN_NOTIONAL_DEFAULT") {
            match v.parse::<Decimal>() {
                Ok(d) if d > Decimal::ZERO => self.execution.default_min_notional = d,
                _ => log::warn!("Ignoring invalid MIN_NOTIONAL_DEFAULT={}", v),
            }
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    let lower = v.to_lowercase();
    if ["1", "true", "yes"].contains(&lower.as_str()) { return Some(true); }
    if ["0", "false", "no"].contains(&lower.as_str()) { return Some(false); }
    None
}

impl Default for Config {
    fn default() -> Self {
        Config {
            exchange: ExchangeConfig::default(),
            execution: ExecutionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            api_key: None,
            api_secret: None,
            testnet: true,
            base_url: None,
            recv_window_ms: 5000,
            timeout_ms: 10_000,
            use_mock: false,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            default_min_notional: dec!(100.0),
            quantity_precision: 8,
            default_time_in_force: TimeInForce::Gtc,
            twap_default_slices: 5,
            twap_default_interval_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: "info".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_min_notional_fallback() {
        let cfg = Config::default();
        assert_eq!(cfg.execution.default_min_notional, dec!(100));
        assert_eq!(cfg.execution.quantity_precision, 8);
    }

    #[test]
    fn test_cli_credentials_override() {
        let mut exchange = ExchangeConfig {
            api_key: Some("file-key".to_string()),
            api_secret: Some("file-secret".to_string()),
            ..ExchangeConfig::default()
        };
        exchange.override_credentials(Some("cli-key".to_string()), None);
        assert_eq!(exchange.credentials().unwrap(), ("cli-key", "file-secret"));

        exchange.override_credentials(Some(String::new()), Some("cli-secret".to_string()));
        assert_eq!(exchange.credentials().unwrap(), ("cli-key", "cli-secret"));
    }

    #[test]
    fn test_endpoint_selection() {
        let mut exchange = ExchangeConfig::default();
        assert_eq!(exchange.endpoint(), TESTNET_BASE_URL);

        exchange.testnet = false;
        assert_eq!(exchange.endpoint(), LIVE_BASE_URL);

        exchange.base_url = Some("http://localhost:9000".to_string());
        assert_eq!(exchange.endpoint(), "http://localhost:9000");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"execution": {"default_min_notional": "5"}}"#).unwrap();
        assert_eq!(cfg.execution.default_min_notional, dec!(5));
        assert_eq!(cfg.execution.twap_default_slices, 5);
        assert!(cfg.exchange.testnet);
    }

    #[test]
    fn test_missing_credentials() {
        let exchange = ExchangeConfig::default();
        assert!(matches!(exchange.credentials(), Err(TradingError::ConfigError(_))));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("YES"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
