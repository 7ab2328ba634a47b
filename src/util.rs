use chrono::NaiveDate;
use log::info;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::errors::Result;

/// 原始日线表：日期字符串 -> (列名 -> 值)
pub type RawSeries = BTreeMap<String, BTreeMap<String, Value>>;

// 日期转换工具
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")?)
}

/// 写入中间文件，必要时创建目录
pub fn write_staging_file(path: &Path, series: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, series)?;
    writer.flush()?;

    info!("Wrote {} daily records to {}", series.len(), path.display());
    Ok(())
}

pub fn read_staging_file(path: &Path) -> Result<RawSeries> {
    let file = File::open(path)?;
    let series: RawSeries = serde_json::from_reader(BufReader::new(file))?;
    info!("Loaded {} daily records from {}", series.len(), path.display());
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PipelineError;
    use serde_json::json;

    #[test]
    fn parses_iso_dates() {
        assert_eq!(
            parse_date("2025-06-12").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 12).unwrap()
        );
        assert!(matches!(parse_date("12/06/2025"), Err(PipelineError::DateError(_))));
    }

    #[test]
    fn staging_file_round_trips_through_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bitcoin_data.json");

        let mut series = Map::new();
        series.insert(
            "2025-06-12".to_string(),
            json!({"1. open": "100.0", "4. close": "101.5"}),
        );
        write_staging_file(&path, &series).unwrap();

        let loaded = read_staging_file(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["2025-06-12"]["4. close"], json!("101.5"));
    }

    #[test]
    fn missing_staging_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_staging_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(PipelineError::IoError(_))));
    }
}
