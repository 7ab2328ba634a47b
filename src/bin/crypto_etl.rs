use crypto_etl::config::Config;
use crypto_etl::scrapers::alpha_vantage::AlphaVantageClient;
use crypto_etl::scrapers::base::MarketDataSource;
use crypto_etl::services::pipeline_service::{self, PipelineService};
use crypto_etl::storage::MetricsStore;

use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use log::{info, warn};
use std::sync::Arc;

fn build_cli() -> Command<'static> {
    let common = [
        Arg::new("symbol")
            .short('s')
            .long("symbol")
            .value_name("SYMBOL")
            .help("Crypto symbol to fetch")
            .takes_value(true)
            .default_value("BTC"),
        Arg::new("market")
            .short('m')
            .long("market")
            .value_name("MARKET")
            .help("Market currency the prices are quoted in")
            .takes_value(true)
            .default_value("USD"),
        Arg::new("staging-file")
            .long("staging-file")
            .value_name("PATH")
            .help("Intermediate JSON file between extract and transform")
            .takes_value(true)
            .default_value("/tmp/bitcoin_data.json"),
        Arg::new("table")
            .short('t')
            .long("table")
            .value_name("TABLE")
            .help("Target PostgreSQL table")
            .takes_value(true)
            .default_value("bitcoin_metrics"),
        Arg::new("database-url")
            .long("database-url")
            .value_name("URL")
            .help("PostgreSQL connection string (defaults to $DATABASE_URL)")
            .takes_value(true),
    ];

    Command::new("crypto_etl")
        .version("1.0.0")
        .about("Daily crypto price ETL: fetch, compute indicators, load into PostgreSQL")
        .subcommand_required(true)
        .args(&common)
        .subcommand(Command::new("prepare").about("Create the metrics table if needed and truncate it"))
        .subcommand(Command::new("extract").about("Fetch daily prices and write the staging file"))
        .subcommand(
            Command::new("transform-load")
                .about("Compute indicators from the staging file and load them"),
        )
        .subcommand(Command::new("run").about("Run prepare, extract and transform-load in order"))
        .subcommand(
            Command::new("inspect")
                .about("Transform the staging file and print a summary, without touching the database"),
        )
}

fn config_from_matches(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = Config::from_env();
    if let Some(symbol) = matches.value_of("symbol") {
        config = config.with_symbol(symbol);
    }
    if let Some(market) = matches.value_of("market") {
        config = config.with_market(market);
    }
    if let Some(path) = matches.value_of("staging-file") {
        config = config.with_staging_file(path);
    }
    if let Some(table) = matches.value_of("table") {
        config = config.with_table_name(table);
    }
    if let Some(url) = matches.value_of("database-url") {
        config = config.with_database_url(url);
    }
    config.validate()?;
    Ok(config)
}

async fn connect_store(config: &Config) -> anyhow::Result<MetricsStore> {
    let url = config.require_database_url()?;
    let store = MetricsStore::connect(url, &config.table_name)
        .await
        .context("failed to connect to PostgreSQL")?;
    Ok(store)
}

fn build_service(config: &Config) -> anyhow::Result<PipelineService> {
    let source: Arc<dyn MarketDataSource + Send + Sync> = Arc::new(AlphaVantageClient::new(config)?);
    Ok(PipelineService::new(config.clone(), source))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let matches = build_cli().get_matches();
    let config = config_from_matches(&matches)?;
    info!(
        "Pipeline for {}/{} -> table {}",
        config.symbol, config.market, config.table_name
    );

    match matches.subcommand() {
        Some(("prepare", _)) => {
            let store = connect_store(&config).await?;
            store.prepare_table().await?;
        }
        Some(("extract", _)) => {
            let service = build_service(&config)?;
            let count = service.extract().await?;
            info!("Extracted {} daily records", count);
        }
        Some(("transform-load", _)) => {
            let store = connect_store(&config).await?;
            pipeline_service::transform_and_load(&config, &store).await?;
        }
        Some(("run", _)) => {
            let service = build_service(&config)?;
            let store = connect_store(&config).await?;
            let inserted = service.run(&store).await?;
            let persisted = store.count_rows().await?;
            info!(
                "Pipeline finished, {} rows inserted, {} rows in {}",
                inserted,
                persisted,
                store.table()
            );
        }
        Some(("inspect", _)) => {
            let rows = pipeline_service::transform_staging(&config)?;
            match (rows.first(), rows.last()) {
                (Some(first), Some(last)) => {
                    info!("{} rows from {} to {}", rows.len(), first.date(), last.date());
                    info!("Last row: {}", serde_json::to_string(last)?);
                }
                _ => warn!("Staging file {} has no rows", config.staging_file.display()),
            }
        }
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}
