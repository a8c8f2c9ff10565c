//! AI News Pipeline — Binary Entrypoint
//! Boots the Axum control surface, the background scheduler, and the
//! realtime monitor around a shared SQLite store.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ai_news_pipeline::api::{self, AppState};
use ai_news_pipeline::automation::AutomationController;
use ai_news_pipeline::config::PipelineConfig;
use ai_news_pipeline::ingest::fetch::{FeedFetch, HttpFetcher};
use ai_news_pipeline::metrics::Metrics;
use ai_news_pipeline::monitor;
use ai_news_pipeline::scheduler;
use ai_news_pipeline::store::Store;
use ai_news_pipeline::summary::{ExtractiveEngine, RemoteSummaryEngine, SummaryEngine};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ingest=info,monitor=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = PipelineConfig::from_env();

    let store = Arc::new(
        Store::open(&cfg.db_path)
            .await
            .with_context(|| format!("opening datastore at {}", cfg.db_path))?,
    );

    let metrics = Metrics::init(cfg.fetch_interval_secs());

    let fetcher: Arc<dyn FeedFetch> = Arc::new(HttpFetcher::new(&cfg)?);
    let engine: Arc<dyn SummaryEngine> = match &cfg.summary_endpoint {
        Some(endpoint) => Arc::new(RemoteSummaryEngine::new(
            endpoint.clone(),
            &cfg.user_agent,
        )?),
        None => Arc::new(ExtractiveEngine),
    };

    let controller = Arc::new(AutomationController::new(
        store.clone(),
        fetcher.clone(),
        engine.clone(),
        cfg.clone(),
    ));

    let init = controller.initialize().await;
    if init.success {
        tracing::info!(message = %init.message, "automation initialized");
    } else {
        tracing::error!(message = %init.message, "automation initialization failed");
    }

    // Keep the handle alive for the lifetime of the process; dropping it
    // would unsubscribe the monitor.
    let _monitor = monitor::start_realtime_monitoring(&store);
    let _scheduler =
        scheduler::spawn_pipeline_scheduler(store.clone(), fetcher, engine, cfg.clone());

    let state = AppState { controller };
    let app = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
