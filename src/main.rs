//! Fraud Scoring Service - Main Entry Point
//!
//! Loads the trained model (or the heuristic fallback) once, then serves
//! scoring requests over HTTP until interrupted.

use anyhow::{Context, Result};
use fraud_scoring::{
    api::create_router,
    config::AppConfig,
    logging,
    metrics::{MetricsReporter, ScoringMetrics},
    models::ModelLoader,
    ScoringService,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init(&config.logging);

    info!("Starting Fraud Scoring Service");
    info!(
        model_path = %config.model.path,
        threshold = config.detection.threshold,
        "Configuration loaded"
    );

    let loaded = ModelLoader::from_config(&config.model).load(&config.model.path);
    info!(
        model_type = %loaded.status.active,
        model_loaded = loaded.status.loaded,
        "Classifier ready"
    );

    let metrics = Arc::new(ScoringMetrics::new());
    let service = ScoringService::new(loaded)
        .with_detection(config.detection.clone())
        .with_metrics(metrics.clone());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = create_router(Arc::new(service));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
