//! Runs one cost schedule recalculation against the configured backend

use anyhow::Context;
use cost_engine::{BackendClient, Config, CostEngine, RecalculationRequest};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: cost-recalc <request.json>")?;

    // Load configuration
    let config = match std::env::var("COST_ENGINE_CONFIG") {
        Ok(file) => Config::from_file(&file).with_context(|| format!("loading {}", file))?,
        Err(_) => Config::from_env()?,
    };
    tracing::info!("Starting {} {}", config.service_name, config.service_version);

    let body = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
    let request: RecalculationRequest =
        serde_json::from_str(&body).with_context(|| format!("parsing {}", path))?;

    let backend = Arc::new(BackendClient::new(config.backend.clone(), config.lookups.clone())?);
    let engine = CostEngine::new(backend.clone(), backend.clone(), backend, &config);

    let outcome = engine.recalculate(&request).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
