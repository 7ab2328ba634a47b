use crate::config::Config;
use crate::errors::{PipelineError, Result};
use crate::scrapers::base::MarketDataSource;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DIGITAL_CURRENCY_DAILY: &str = "DIGITAL_CURRENCY_DAILY";

/// Alpha Vantage 行情客户端
pub struct AlphaVantageClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    /// 创建新的客户端，API密钥缺失时直接失败
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(PipelineError::RequestError)?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// 拼接查询URL，额外参数按给定顺序追加
    pub fn build_url(&self, function: &str, symbol: &str, extra_params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}?function={}&symbol={}&apikey={}",
            self.base_url, function, symbol, self.api_key
        );
        for (key, value) in extra_params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }
        url
    }

    /// 单次GET请求，非2xx状态直接报错
    pub async fn retrieve_data(
        &self,
        function: &str,
        symbol: &str,
        extra_params: &[(&str, &str)],
    ) -> Result<Value> {
        let url = self.build_url(function, symbol, extra_params);
        debug!("GET {}", url.replace(&self.api_key, "***"));

        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?;

        let json: Value = response.json().await?;
        debug!("成功获取响应");
        Ok(json)
    }
}

#[async_trait]
impl MarketDataSource for AlphaVantageClient {
    fn provider_name(&self) -> &'static str {
        "alphavantage"
    }

    async fn fetch_crypto_daily(&self, symbol: &str, market: &str) -> Result<Value> {
        info!("Fetching {} daily data for {}/{}", DIGITAL_CURRENCY_DAILY, symbol, market);
        self.retrieve_data(DIGITAL_CURRENCY_DAILY, symbol, &[("market", market)])
            .await
    }
}
