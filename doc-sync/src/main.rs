//! Document sync worker entry point.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use doc_sync::{Dependencies, WorkerError};

#[tokio::main]
async fn main() -> Result<(), WorkerError> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("Starting document sync worker");

    let deps = Dependencies::new().await?;

    if let Err(e) = deps.orchestrator.run().await {
        error!(error = %e, "Worker stopped with error");
        return Err(e.into());
    }

    info!("Worker stopped");
    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` controls the filter (default `info`); `LOG_FORMAT=json`
/// switches to JSON output for log aggregation.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
