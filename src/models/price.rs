use chrono::NaiveDate;
use serde::Serialize;

/// OHLCV列，顺序即列名启发式匹配的优先顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OhlcvField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl OhlcvField {
    pub const ALL: [OhlcvField; 5] = [
        OhlcvField::Open,
        OhlcvField::High,
        OhlcvField::Low,
        OhlcvField::Close,
        OhlcvField::Volume,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            OhlcvField::Open => "open",
            OhlcvField::High => "high",
            OhlcvField::Low => "low",
            OhlcvField::Close => "close",
            OhlcvField::Volume => "volume",
        }
    }

    /// 按子串匹配API返回的列名，例如 "1. open" 或 "4b. close (USD)"
    pub fn match_column(column: &str) -> Option<OhlcvField> {
        let lower = column.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|field| lower.contains(field.canonical_name()))
    }
}

/// 日线数据结构，缺失的整列为 None（入库为 NULL）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPrice {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<f64>,
}

/// 技术指标，历史不足时为 0
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IndicatorValues {
    pub sma_20: f64,
    pub ema_50: f64,
    pub rsi_14: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
}

/// 入库行：日线数据加指标，主键为日期
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    #[serde(flatten)]
    pub price: DailyPrice,
    #[serde(flatten)]
    pub indicators: Option<IndicatorValues>,
}

impl MetricsRow {
    pub fn date(&self) -> NaiveDate {
        self.price.date
    }

    /// BIGINT列，成交量四舍五入
    pub fn volume_as_i64(&self) -> Option<i64> {
        self.price.volume.map(|v| v.round() as i64)
    }
}
