use crate::errors::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Base trait for market data sources
#[async_trait]
pub trait MarketDataSource {
    /// Provider name used in logs
    fn provider_name(&self) -> &'static str;

    /// Fetch the raw daily time series response for a crypto symbol
    /// quoted in the given market currency
    async fn fetch_crypto_daily(&self, symbol: &str, market: &str) -> Result<Value>;
}
