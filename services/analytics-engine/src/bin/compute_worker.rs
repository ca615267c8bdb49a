//! JSON-lines front end for the compute worker
//!
//! Reads one request per line from stdin and writes one response per line to
//! stdout, starting with `{"type":"READY"}`. Logs go to stderr.

use std::path::PathBuf;

use analytics_engine::worker::{ComputeWorker, WorkerMessage};
use analytics_engine::AnalyticsConfig;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "compute-worker", version, about = "Run indicator computations over a JSON-lines pipe")]
struct Args {
    /// Optional JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `analytics_engine=debug`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level)?)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => AnalyticsConfig::from_file(path)?,
        None => AnalyticsConfig::default(),
    };

    tracing::info!(version = analytics_engine::SERVICE_VERSION, "Starting compute worker");

    let worker = ComputeWorker::spawn(&config.worker)?;
    let metrics = worker.metrics();
    let (requests, mut responses, thread) = worker.into_parts();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = responses.recv().await {
            let mut line = serde_json::to_vec(&response)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }
        Ok::<_, anyhow::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if requests.send(WorkerMessage::Json(line)).await.is_err() {
            tracing::error!("Compute worker stopped unexpectedly");
            break;
        }
    }

    // Closing the inbound channel lets the worker drain and exit.
    drop(requests);
    writer.await??;
    tokio::task::spawn_blocking(move || thread.join())
        .await?
        .map_err(|_| anyhow::anyhow!("compute worker thread panicked"))?;

    tracing::info!(metrics = ?metrics.export(), "Compute worker finished");
    Ok(())
}
