use crate::config::is_valid_identifier;
use crate::errors::{PipelineError, Result};
use crate::models::price::MetricsRow;
use crate::transform::OUTPUT_COLUMNS;
use log::{debug, info};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

/// 单条INSERT最多的行数，13列 x 1000 行远低于 65535 个绑定参数
pub const INSERT_CHUNK_ROWS: usize = 1000;

/// 按 INSERT_CHUNK_ROWS 切分待写入的行
pub fn insert_batches<T>(rows: &[T]) -> Vec<&[T]> {
    rows.chunks(INSERT_CHUNK_ROWS).collect()
}

pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
    date DATE PRIMARY KEY,
    open NUMERIC,
    high NUMERIC,
    low NUMERIC,
    close NUMERIC,
    adj_close NUMERIC,
    volume BIGINT,
    sma_20 NUMERIC,
    ema_50 NUMERIC,
    rsi_14 NUMERIC,
    macd_12_26_9 NUMERIC,
    macdh_12_26_9 NUMERIC,
    macds_12_26_9 NUMERIC
)"
    )
}

pub fn truncate_table_sql(table: &str) -> String {
    format!("TRUNCATE TABLE {table}")
}

/// 多行INSERT语句，列顺序同 OUTPUT_COLUMNS
pub fn insert_query<'a>(table: &str, rows: &'a [MetricsRow]) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        table,
        OUTPUT_COLUMNS.join(", ")
    ));
    builder.push_values(rows, |mut b, row| {
        let ind = row.indicators;
        b.push_bind(row.date())
            .push_bind(row.price.open)
            .push_bind(row.price.high)
            .push_bind(row.price.low)
            .push_bind(row.price.close)
            .push_bind(row.price.adj_close)
            .push_bind(row.volume_as_i64())
            .push_bind(ind.map(|i| i.sma_20))
            .push_bind(ind.map(|i| i.ema_50))
            .push_bind(ind.map(|i| i.rsi_14))
            .push_bind(ind.map(|i| i.macd))
            .push_bind(ind.map(|i| i.macd_histogram))
            .push_bind(ind.map(|i| i.macd_signal));
    });
    builder
}

/// 指标表的PostgreSQL存储
pub struct MetricsStore {
    pool: PgPool,
    table: String,
}

impl MetricsStore {
    pub async fn connect(database_url: &str, table: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await?;
        Self::from_pool(pool, table)
    }

    pub fn from_pool(pool: PgPool, table: &str) -> Result<Self> {
        if !is_valid_identifier(table) {
            return Err(PipelineError::ConfigError(format!(
                "invalid table name: {table:?}"
            )));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// 建表（若不存在）并清空，保证每次运行都是全量覆盖
    pub async fn prepare_table(&self) -> Result<()> {
        info!("Preparing table {}", self.table);
        sqlx::query(&create_table_sql(&self.table))
            .execute(&self.pool)
            .await?;
        sqlx::query(&truncate_table_sql(&self.table))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// 追加写入所有行，单个事务内分批提交
    pub async fn load_rows(&self, rows: &[MetricsRow]) -> Result<u64> {
        if rows.is_empty() {
            info!("No rows to load into {}", self.table);
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for chunk in insert_batches(rows) {
            let mut query = insert_query(&self.table, chunk);
            let result = query.build().execute(&mut *tx).await?;
            debug!("Inserted chunk of {} rows", result.rows_affected());
            inserted += result.rows_affected();
        }
        tx.commit().await?;

        info!("Loaded {} rows into {}", inserted, self.table);
        Ok(inserted)
    }

    pub async fn count_rows(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT count(*) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
