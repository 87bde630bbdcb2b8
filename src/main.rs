use std::io::Write;

use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use txwatch_scorer::config::Config;
use txwatch_scorer::ingest::feed::{parse_feed, Ingestor};
use txwatch_scorer::pipeline::RiskPipeline;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Logs go to stderr; stdout carries the scored records (set RUST_LOG=debug for detail)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("TXWATCH_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::info!("TxWatch scorer starting");

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "config.toml".to_string());
    let feed_path = args.next().unwrap_or_else(|| "-".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        jurisdictions = config.scoring.high_risk_jurisdictions.len(),
        workers = config.pipeline.workers,
        "Configuration loaded from {}",
        config_path
    );

    // Read the transaction feed (a JSON object or array), "-" for stdin
    let content = if feed_path == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(&feed_path)
            .await
            .map_err(|e| eyre::eyre!("Failed to read feed '{}': {}", feed_path, e))?
    };

    let records = parse_feed(&content)?;
    let (transactions, rejected) = Ingestor::default().admit_batch(records);
    if !rejected.is_empty() {
        tracing::warn!(
            rejected = rejected.len(),
            "Some feed records were rejected at ingestion"
        );
    }
    tracing::info!(admitted = transactions.len(), "Transactions ingested");

    let mut pipeline = RiskPipeline::init(&config);
    let (scored, summary) = pipeline.run(transactions).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for record in &scored {
        serde_json::to_writer(&mut out, record)?;
        writeln!(out)?;
    }
    out.flush()?;

    tracing::info!(
        processed = summary.processed,
        flagged = summary.flagged,
        enriched = summary.enriched,
        "TxWatch scorer finished"
    );
    Ok(())
}
