use crate::errors::{PipelineError, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "https://www.alphavantage.co/query";

pub const ENV_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
pub const ENV_API_BASE_URL: &str = "ALPHA_VANTAGE_BASE_URL";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

#[derive(Debug, Clone)]
pub struct Config {
    pub symbol: String,
    pub market: String,
    pub staging_file: PathBuf,
    pub table_name: String,
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub database_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            symbol: "BTC".to_string(),
            market: "USD".to_string(),
            staging_file: PathBuf::from("/tmp/bitcoin_data.json"),
            table_name: "bitcoin_metrics".to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            database_url: None,
            timeout_secs: 30,
        }
    }

    /// 从环境变量读取密钥与连接串，其余字段保持默认
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Some(key) = non_empty_var(ENV_API_KEY) {
            config.api_key = Some(key);
        }
        if let Some(url) = non_empty_var(ENV_DATABASE_URL) {
            config.database_url = Some(url);
        }
        if let Some(base) = non_empty_var(ENV_API_BASE_URL) {
            config.api_base_url = base;
        }
        config
    }

    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = symbol.to_uppercase();
        self
    }

    pub fn with_market(mut self, market: &str) -> Self {
        self.market = market.to_uppercase();
        self
    }

    pub fn with_staging_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_file = path.into();
        self
    }

    pub fn with_table_name(mut self, table: &str) -> Self {
        self.table_name = table.to_string();
        self
    }

    pub fn with_api_base_url(mut self, url: &str) -> Self {
        self.api_base_url = url.to_string();
        self
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_database_url(mut self, url: &str) -> Self {
        self.database_url = Some(url.to_string());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// API密钥，缺失或为空时报错
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(PipelineError::ConfigError(format!(
                "Alpha Vantage API key not found; set {}",
                ENV_API_KEY
            ))),
        }
    }

    pub fn require_database_url(&self) -> Result<&str> {
        match self.database_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(PipelineError::ConfigError(format!(
                "database url not found; set {} or pass --database-url",
                ENV_DATABASE_URL
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_identifier(&self.table_name) {
            return Err(PipelineError::ConfigError(format!(
                "invalid table name: {:?}",
                self.table_name
            )));
        }
        if self.symbol.is_empty() || self.market.is_empty() {
            return Err(PipelineError::ConfigError(
                "symbol and market must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// 表名只允许普通SQL标识符，会被直接拼进DDL
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_bitcoin_table() {
        let config = Config::new();
        assert_eq!(config.symbol, "BTC");
        assert_eq!(config.market, "USD");
        assert_eq!(config.table_name, "bitcoin_metrics");
        assert_eq!(config.staging_file, PathBuf::from("/tmp/bitcoin_data.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_overrides_fields() {
        let config = Config::new()
            .with_symbol("eth")
            .with_market("eur")
            .with_table_name("eth_metrics")
            .with_timeout_secs(5);
        assert_eq!(config.symbol, "ETH");
        assert_eq!(config.market, "EUR");
        assert_eq!(config.table_name, "eth_metrics");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let config = Config::new();
        assert!(matches!(
            config.require_api_key(),
            Err(PipelineError::ConfigError(_))
        ));

        let blank = Config::new().with_api_key("   ");
        assert!(blank.require_api_key().is_err());

        let set = Config::new().with_api_key("demo");
        assert_eq!(set.require_api_key().unwrap(), "demo");
    }

    #[test]
    fn rejects_unsafe_table_names() {
        assert!(is_valid_identifier("bitcoin_metrics"));
        assert!(is_valid_identifier("_t1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1table"));
        assert!(!is_valid_identifier("metrics; DROP TABLE x"));
        assert!(!is_valid_identifier("public.metrics"));

        let config = Config::new().with_table_name("bad name");
        assert!(config.validate().is_err());
    }
}
