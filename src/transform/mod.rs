pub mod columns;
pub mod indicators;

use crate::errors::Result;
use crate::models::price::{DailyPrice, IndicatorValues, MetricsRow, OhlcvField};
use crate::util::RawSeries;
use log::{info, warn};

pub use columns::{normalize, PriceTable};
pub use indicators::IndicatorSeries;

pub const OUTPUT_COLUMNS: [&str; 13] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "adj_close",
    "volume",
    "sma_20",
    "ema_50",
    "rsi_14",
    "macd_12_26_9",
    "macdh_12_26_9",
    "macds_12_26_9",
];

/// NaN 填 0
fn fill_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

fn cell(table: &PriceTable, field: OhlcvField, row: usize) -> Option<f64> {
    table.column(field).map(|col| fill_zero(col[row]))
}

/// 原始表 -> 带指标的入库行，按日期升序
pub fn transform(raw: &RawSeries) -> Result<Vec<MetricsRow>> {
    let table = normalize(raw)?;

    let indicators = if table.has_all_ohlcv() {
        let closes = table.column(OhlcvField::Close).unwrap_or(&[]);
        Some(indicators::compute(closes)?)
    } else {
        warn!("Not all OHLCV columns available for technical indicators");
        None
    };

    let rows: Vec<MetricsRow> = (0..table.len())
        .map(|i| {
            let close = cell(&table, OhlcvField::Close, i);
            MetricsRow {
                price: DailyPrice {
                    date: table.dates[i],
                    open: cell(&table, OhlcvField::Open, i),
                    high: cell(&table, OhlcvField::High, i),
                    low: cell(&table, OhlcvField::Low, i),
                    close,
                    adj_close: close,
                    volume: cell(&table, OhlcvField::Volume, i),
                },
                indicators: indicators.as_ref().map(|s| IndicatorValues {
                    sma_20: fill_zero(s.sma_20[i]),
                    ema_50: fill_zero(s.ema_50[i]),
                    rsi_14: fill_zero(s.rsi_14[i]),
                    macd: fill_zero(s.macd[i]),
                    macd_signal: fill_zero(s.macd_signal[i]),
                    macd_histogram: fill_zero(s.macd_histogram[i]),
                }),
            }
        })
        .collect();

    let columns = present_columns(&table, indicators.is_some());
    info!("Final columns: {:?}", columns);
    info!("Transformed shape: ({}, {})", rows.len(), columns.len());
    Ok(rows)
}

/// 实际输出的列，缺失整列的不计入
fn present_columns(table: &PriceTable, with_indicators: bool) -> Vec<&'static str> {
    OUTPUT_COLUMNS
        .iter()
        .copied()
        .filter(|name| match *name {
            "date" => true,
            "adj_close" => table.column(OhlcvField::Close).is_some(),
            "sma_20" | "ema_50" | "rsi_14" | "macd_12_26_9" | "macdh_12_26_9"
            | "macds_12_26_9" => with_indicators,
            other => OhlcvField::ALL
                .iter()
                .any(|f| f.canonical_name() == other && table.column(*f).is_some()),
        })
        .collect()
}
