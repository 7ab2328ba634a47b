use crate::config::Config;
use crate::errors::{PipelineError, Result};
use crate::models::price::MetricsRow;
use crate::scrapers::base::MarketDataSource;
use crate::storage::MetricsStore;
use crate::transform;
use crate::util;
use log::info;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const TIME_SERIES_KEY: &str = "Time Series (Digital Currency Daily)";

/// API在200响应里携带的提示字段
const DIAGNOSTIC_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

/// 从响应中取出按日期索引的时间序列，为空则报错
pub fn extract_time_series(response: &Value) -> Result<Map<String, Value>> {
    match response.get(TIME_SERIES_KEY).and_then(|v| v.as_object()) {
        Some(series) if !series.is_empty() => Ok(series.clone()),
        _ => {
            let diagnostic = DIAGNOSTIC_KEYS
                .iter()
                .find_map(|key| response.get(*key).and_then(|v| v.as_str()));
            Err(PipelineError::DataError(match diagnostic {
                Some(msg) => format!("No data found in the API response: {msg}"),
                None => "No data found in the API response.".to_string(),
            }))
        }
    }
}

/// 读取中间文件并计算指标，不涉及数据库
pub fn transform_staging(config: &Config) -> Result<Vec<MetricsRow>> {
    let raw = util::read_staging_file(&config.staging_file)?;
    transform::transform(&raw)
}

/// 转换并入库，这一步不需要访问行情API
pub async fn transform_and_load(config: &Config, store: &MetricsStore) -> Result<u64> {
    info!("Transforming and loading {} data...", config.symbol);
    let rows = transform_staging(config)?;

    info!("Loading data into PostgreSQL table {}...", store.table());
    let inserted = store.load_rows(&rows).await?;
    info!(
        "{} data transformed and loaded successfully into PostgreSQL.",
        config.symbol
    );
    Ok(inserted)
}

/// 数据管道服务：抓取 -> 中间文件 -> 转换 -> 入库
pub struct PipelineService {
    config: Config,
    source: Arc<dyn MarketDataSource + Send + Sync>,
}

impl PipelineService {
    pub fn new(config: Config, source: Arc<dyn MarketDataSource + Send + Sync>) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 抓取日线数据并写入中间文件，返回记录数
    pub async fn extract(&self) -> Result<usize> {
        info!(
            "Extracting {} data from {}...",
            self.config.symbol,
            self.source.provider_name()
        );
        let response = self
            .source
            .fetch_crypto_daily(&self.config.symbol, &self.config.market)
            .await?;
        let series = extract_time_series(&response)?;

        util::write_staging_file(&self.config.staging_file, &series)?;
        info!("{} data extracted and saved successfully.", self.config.symbol);
        Ok(series.len())
    }

    pub fn transform_staging(&self) -> Result<Vec<MetricsRow>> {
        transform_staging(&self.config)
    }

    pub async fn transform_and_load(&self, store: &MetricsStore) -> Result<u64> {
        transform_and_load(&self.config, store).await
    }

    /// 完整流程：建表清空 -> 抓取 -> 转换入库
    pub async fn run(&self, store: &MetricsStore) -> Result<u64> {
        store.prepare_table().await?;
        self.extract().await?;
        self.transform_and_load(store).await
    }
}
