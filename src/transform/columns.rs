use crate::errors::{PipelineError, Result};
use crate::models::price::OhlcvField;
use crate::util::{self, RawSeries};
use chrono::NaiveDate;
use log::{debug, info};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// 按日期升序排列的OHLCV表，行内缺失值为 NaN
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    pub dates: Vec<NaiveDate>,
    pub columns: BTreeMap<OhlcvField, Vec<f64>>,
}

impl PriceTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, field: OhlcvField) -> Option<&[f64]> {
        self.columns.get(&field).map(|v| v.as_slice())
    }

    pub fn available_fields(&self) -> Vec<OhlcvField> {
        self.columns.keys().copied().collect()
    }

    pub fn has_all_ohlcv(&self) -> bool {
        OhlcvField::ALL.iter().all(|f| self.columns.contains_key(f))
    }
}

/// 源列名 -> 标准列；多列命中同一标准列时取字典序第一个
pub fn map_columns<'a, I>(columns: I) -> BTreeMap<String, OhlcvField>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut claimed = BTreeSet::new();
    let mut mapping = BTreeMap::new();
    let sorted: BTreeSet<&String> = columns.into_iter().collect();

    for column in sorted {
        if let Some(field) = OhlcvField::match_column(column) {
            if claimed.insert(field) {
                mapping.insert(column.clone(), field);
            } else {
                debug!("Column {:?} duplicates {}, ignored", column, field.canonical_name());
            }
        }
    }
    mapping
}

fn parse_value(date: &str, column: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Null => Ok(f64::NAN),
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            PipelineError::DataError(format!("{date}/{column}: number out of range"))
        }),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            PipelineError::DataError(format!("{date}/{column}: cannot parse {s:?} as float"))
        }),
        other => Err(PipelineError::DataError(format!(
            "{date}/{column}: unexpected value {other}"
        ))),
    }
}

/// 原始JSON表 -> 重命名、排序后的OHLCV表
pub fn normalize(raw: &RawSeries) -> Result<PriceTable> {
    let all_columns: BTreeSet<&String> = raw.values().flat_map(|row| row.keys()).collect();
    info!("Original columns: {:?}", all_columns);

    let mapping = map_columns(all_columns.iter().copied());
    let renamed: Vec<&str> = all_columns
        .iter()
        .map(|c| match mapping.get(*c) {
            Some(field) => field.canonical_name(),
            None => c.as_str(),
        })
        .collect();
    info!("Columns after renaming: {:?}", renamed);

    let mut rows: Vec<(NaiveDate, BTreeMap<OhlcvField, f64>)> = Vec::with_capacity(raw.len());
    for (date_str, row) in raw {
        let date = util::parse_date(date_str)?;
        let mut values = BTreeMap::new();
        for (column, field) in &mapping {
            let value = match row.get(column) {
                Some(v) => parse_value(date_str, column, v)?,
                None => f64::NAN,
            };
            values.insert(*field, value);
        }
        rows.push((date, values));
    }

    rows.sort_by_key(|(date, _)| *date);
    if let Some(pair) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(PipelineError::DataError(format!(
            "duplicate date in series: {}",
            pair[0].0
        )));
    }

    let available: Vec<OhlcvField> = OhlcvField::ALL
        .iter()
        .copied()
        .filter(|f| mapping.values().any(|m| m == f))
        .collect();
    info!(
        "Available OHLCV columns: {:?}",
        available.iter().map(|f| f.canonical_name()).collect::<Vec<_>>()
    );

    let mut table = PriceTable {
        dates: rows.iter().map(|(d, _)| *d).collect(),
        columns: BTreeMap::new(),
    };
    for field in available {
        let series = rows
            .iter()
            .map(|(_, values)| values.get(&field).copied().unwrap_or(f64::NAN))
            .collect();
        table.columns.insert(field, series);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(entries: &[(&str, Value)]) -> RawSeries {
        entries
            .iter()
            .map(|(date, row)| {
                let row: BTreeMap<String, Value> = serde_json::from_value(row.clone()).unwrap();
                (date.to_string(), row)
            })
            .collect()
    }

    #[test]
    fn renames_and_sorts_ascending() {
        let series = raw(&[
            (
                "2025-06-12",
                json!({"1. open": "10", "2. high": "12", "3. low": "9", "4. close": "11", "5. volume": "100.5"}),
            ),
            (
                "2025-06-10",
                json!({"1. open": "8", "2. high": "9", "3. low": "7", "4. close": "8.5", "5. volume": "90"}),
            ),
        ]);

        let table = normalize(&series).unwrap();
        assert!(table.has_all_ohlcv());
        assert_eq!(
            table.dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
                NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
            ]
        );
        assert_eq!(table.column(OhlcvField::Close).unwrap(), &[8.5, 11.0]);
        assert_eq!(table.column(OhlcvField::Volume).unwrap(), &[90.0, 100.5]);
    }

    #[test]
    fn drops_unmatched_and_keeps_first_duplicate() {
        let series = raw(&[(
            "2025-06-12",
            json!({
                "1a. open (USD)": "10",
                "1b. open (USD)": "99",
                "6. market cap (USD)": "1e9"
            }),
        )]);

        let table = normalize(&series).unwrap();
        assert_eq!(table.available_fields(), vec![OhlcvField::Open]);
        assert_eq!(table.column(OhlcvField::Open).unwrap(), &[10.0]);
        assert!(!table.has_all_ohlcv());
    }

    #[test]
    fn missing_cell_becomes_nan() {
        let series = raw(&[
            ("2025-06-10", json!({"4. close": "1"})),
            ("2025-06-11", json!({"1. open": "2"})),
        ]);

        let table = normalize(&series).unwrap();
        let close = table.column(OhlcvField::Close).unwrap();
        assert_eq!(close[0], 1.0);
        assert!(close[1].is_nan());
        assert!(table.column(OhlcvField::Open).unwrap()[0].is_nan());
    }

    #[test]
    fn unparseable_value_is_data_error() {
        let series = raw(&[("2025-06-10", json!({"4. close": "n/a"}))]);
        assert!(matches!(normalize(&series), Err(PipelineError::DataError(_))));
    }

    #[test]
    fn bad_date_is_date_error() {
        let series = raw(&[("yesterday", json!({"4. close": "1"}))]);
        assert!(matches!(normalize(&series), Err(PipelineError::DateError(_))));
    }
}
