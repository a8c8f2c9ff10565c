// src/scheduler.rs
//! Background scheduling: a fetch cycle every interval, then a summary pass
//! after the configured delay. Each tick is independent; a failed cycle
//! waits for the next tick rather than retrying.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::config::PipelineConfig;
use crate::ingest::{self, fetch::FeedFetch};
use crate::store::Store;
use crate::summary::{self, SummaryEngine};

pub fn spawn_pipeline_scheduler(
    store: Arc<Store>,
    fetcher: Arc<dyn FeedFetch>,
    engine: Arc<dyn SummaryEngine>,
    cfg: PipelineConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(cfg.fetch_interval_secs().max(60)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            counter!("news_scheduler_runs_total").increment(1);

            match ingest::run_fetch_cycle(&store, fetcher.as_ref(), &cfg).await {
                Ok(report) => {
                    tracing::info!(
                        target: "ingest",
                        fetched = report.articles_fetched,
                        errors = report.errors,
                        "scheduled fetch tick"
                    );
                }
                Err(e) => {
                    tracing::error!(error = ?e, "scheduled fetch cycle failed");
                    continue;
                }
            }

            tokio::time::sleep(Duration::from_secs(cfg.summary_delay_minutes * 60)).await;
            if let Err(e) =
                summary::process_summaries(&store, engine.as_ref(), cfg.max_summary_batch).await
            {
                tracing::warn!(error = ?e, "scheduled summary pass failed");
            }
        }
    })
}
