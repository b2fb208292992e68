use anyhow::Result;
use chrono::{Duration, Utc};
use coops::log::TracingLogger;
use coops::{AnomalyReport, Client};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Writes the last day's water-level bias for every active station.
    // Endpoints and retry policy come from env vars or a `.coopsrc` file.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let logger = Arc::new(TracingLogger);
    let client = Client::from_env()?.with_logger(logger.clone());

    let end = Utc::now().naive_utc();
    let begin = end - Duration::days(1);
    let summary = AnomalyReport::new(&client, logger)
        .with_progress(true)
        .write(Path::new("anomaly.csv"), begin, end)?;

    tracing::info!(
        stations = summary.stations,
        written = summary.written,
        failed = summary.failed,
        "anomaly table written"
    );
    Ok(())
}
