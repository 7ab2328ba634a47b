// 公开导出的模块，供外部使用
pub mod models;
pub mod errors;
pub mod config;
pub mod transform;
pub mod storage;

// 管道内部模块，主程序需要访问
#[doc(hidden)]
pub mod scrapers;
#[doc(hidden)]
pub mod services;
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use models::price::{DailyPrice, IndicatorValues, MetricsRow, OhlcvField};
pub use config::Config;
pub use errors::{Result, PipelineError};
pub use storage::MetricsStore;
