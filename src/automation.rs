// src/automation.rs
//! Automation controller: the operational surface the admin UI talks to.
//! Every operation returns a structured result; errors are caught at this
//! boundary and reported as messages, never propagated as panics.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use serde::Serialize;

use crate::config::{self, PipelineConfig};
use crate::error::Result;
use crate::ingest::{self, fetch::FeedFetch, OP_FETCH_NEWS};
use crate::store::types::{ArticleStatus, LogStatus, NewsArticle};
use crate::store::Store;
use crate::summary::{self, SummaryEngine, OP_PROCESS_SUMMARIES};

/// Operation name recorded in pipeline_logs for retention cleanup.
pub const OP_CLEANUP: &str = "cleanup_pipeline_data";

const STATUS_ERROR_WINDOW_SECS: i64 = 24 * 3600;
const RECENT_ERRORS_SHOWN: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct OpResult {
    pub success: bool,
    pub message: String,
}

impl OpResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    Healthy,
    Warning,
    Error,
}

/// Derived view over the log history; nothing here is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AutomationStatus {
    pub is_running: bool,
    pub last_fetch: Option<i64>,
    pub last_summary: Option<i64>,
    pub next_scheduled_fetch: i64,
    pub articles_in_queue: i64,
    pub system_health: SystemHealth,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub issues: Vec<String>,
}

/// Health from the recent error-log count: >3 in the window is an error
/// state, any error at all is a warning.
pub fn health_from_error_count(errors_in_window: i64) -> SystemHealth {
    if errors_in_window > 3 {
        SystemHealth::Error
    } else if errors_in_window > 0 {
        SystemHealth::Warning
    } else {
        SystemHealth::Healthy
    }
}

pub struct AutomationController {
    store: Arc<Store>,
    fetcher: Arc<dyn FeedFetch>,
    engine: Arc<dyn SummaryEngine>,
    cfg: PipelineConfig,
}

impl AutomationController {
    pub fn new(
        store: Arc<Store>,
        fetcher: Arc<dyn FeedFetch>,
        engine: Arc<dyn SummaryEngine>,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            engine,
            cfg,
        }
    }

    /// Verify storage, seed default sources when none are active, and kick
    /// off an initial fetch + delayed summary pass when the catalogue is
    /// empty. Never throws past this boundary.
    pub async fn initialize(&self) -> OpResult {
        match self.initialize_inner().await {
            Ok(msg) => OpResult::ok(msg),
            Err(e) => {
                tracing::error!(error = ?e, "automation initialization failed");
                OpResult::fail(format!("initialization failed: {e}"))
            }
        }
    }

    async fn initialize_inner(&self) -> anyhow::Result<String> {
        // A broken datastore must fail loudly here, not as a silent no-op.
        self.store
            .ping()
            .await
            .map_err(|e| anyhow!("datastore unreachable: {e}"))?;

        let mut actions = Vec::new();

        if self.store.count_active_sources().await? == 0 {
            let desired = config::load_sources_default()?;
            if desired.is_empty() {
                return Err(anyhow!("no news sources configured"));
            }
            for s in &desired {
                self.store.upsert_source(s.clone()).await?;
            }
            let keep: Vec<String> = desired.iter().map(|s| s.url.clone()).collect();
            self.store.deactivate_sources_not_in(keep).await?;
            actions.push(format!("seeded {} sources", desired.len()));
        }

        if self
            .store
            .count_articles_with_status(ArticleStatus::Published)
            .await?
            == 0
        {
            let report =
                ingest::run_fetch_cycle(&self.store, self.fetcher.as_ref(), &self.cfg).await?;
            actions.push(format!(
                "initial fetch: {} articles",
                report.articles_fetched
            ));

            // Two-stage pipeline: fetch now, summarize shortly after.
            let store = self.store.clone();
            let engine = self.engine.clone();
            let batch = self.cfg.max_summary_batch;
            let delay = Duration::from_secs(self.cfg.summary_delay_minutes * 60);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = summary::process_summaries(&store, engine.as_ref(), batch).await {
                    tracing::warn!(error = ?e, "scheduled summary pass failed");
                }
            });
            actions.push("summary pass scheduled".to_string());
        }

        if actions.is_empty() {
            Ok("automation already initialized".to_string())
        } else {
            Ok(actions.join("; "))
        }
    }

    pub async fn status(&self) -> Result<AutomationStatus> {
        let now = chrono::Utc::now().timestamp();

        let last_fetch = self
            .store
            .latest_completed(OP_FETCH_NEWS)
            .await?
            .map(|e| e.created_at);
        let last_summary = self
            .store
            .latest_completed(OP_PROCESS_SUMMARIES)
            .await?
            .map(|e| e.created_at);
        let is_running = matches!(
            self.store.latest_log(OP_FETCH_NEWS).await?,
            Some(e) if e.status == LogStatus::Started
        );
        let articles_in_queue = self
            .store
            .count_articles_with_status(ArticleStatus::Pending)
            .await?;

        let since = now - STATUS_ERROR_WINDOW_SECS;
        let recent_error_count = self.store.count_error_logs_since(since).await?;
        let errors = self
            .store
            .recent_error_messages(since, RECENT_ERRORS_SHOWN)
            .await?;

        Ok(AutomationStatus {
            is_running,
            last_fetch,
            last_summary,
            next_scheduled_fetch: last_fetch
                .map(|t| t + self.cfg.fetch_interval_secs() as i64)
                .unwrap_or(now),
            articles_in_queue,
            system_health: health_from_error_count(recent_error_count),
            errors,
        })
    }

    pub async fn trigger_manual_fetch(&self) -> OpResult {
        match ingest::run_fetch_cycle(&self.store, self.fetcher.as_ref(), &self.cfg).await {
            Ok(r) => OpResult::ok(format!(
                "Fetched {} new articles ({} errors)",
                r.articles_fetched, r.errors
            )),
            Err(e) => OpResult::fail(format!("fetch cycle failed: {e}")),
        }
    }

    pub async fn trigger_manual_summary_processing(&self) -> OpResult {
        match summary::process_summaries(
            &self.store,
            self.engine.as_ref(),
            self.cfg.max_summary_batch,
        )
        .await
        {
            Ok(r) => OpResult::ok(format!(
                "Processed {} articles ({} failed)",
                r.processed, r.failed
            )),
            Err(e) => OpResult::fail(format!("summary processing failed: {e}")),
        }
    }

    /// Retention cleanup: old logs, stale failed articles, corrupted rows.
    /// All three deletions are attempted; any failure surfaces as one
    /// aggregate error result.
    pub async fn perform_cleanup(&self) -> OpResult {
        let now = chrono::Utc::now().timestamp();
        let mut removed = Vec::new();
        let mut problems = Vec::new();

        let log_cutoff = now - (self.cfg.log_retention_days * 86_400) as i64;
        match self.store.purge_logs_before(log_cutoff).await {
            Ok(n) => removed.push(format!("{n} log entries")),
            Err(e) => problems.push(format!("log purge: {e}")),
        }

        let failed_cutoff = now - (self.cfg.failed_retention_days * 86_400) as i64;
        match self.store.delete_failed_before(failed_cutoff).await {
            Ok(n) => removed.push(format!("{n} failed articles")),
            Err(e) => problems.push(format!("failed-article purge: {e}")),
        }

        match self
            .store
            .delete_corrupted(now + self.cfg.future_date_slop_secs())
            .await
        {
            Ok(n) => removed.push(format!("{n} corrupted articles")),
            Err(e) => problems.push(format!("corrupted-article purge: {e}")),
        }

        if problems.is_empty() {
            let msg = format!("Cleanup removed {}", removed.join(", "));
            if let Err(e) = self
                .store
                .append_log(OP_CLEANUP, LogStatus::Completed, &msg, None)
                .await
            {
                tracing::warn!(error = ?e, "cleanup log write failed");
            }
            OpResult::ok(msg)
        } else {
            let msg = format!("cleanup errors: {}", problems.join("; "));
            if let Err(e) = self
                .store
                .append_log(OP_CLEANUP, LogStatus::Error, &msg, None)
                .await
            {
                tracing::warn!(error = ?e, "cleanup log write failed");
            }
            OpResult::fail(msg)
        }
    }

    /// Independent health probe: storage connectivity, source presence,
    /// recent error volume. Problems come back as readable issues, not
    /// errors.
    pub async fn check_system_health(&self) -> HealthReport {
        let mut issues = Vec::new();

        if let Err(e) = self.store.ping().await {
            issues.push(format!("datastore unreachable: {e}"));
            return HealthReport {
                healthy: false,
                issues,
            };
        }

        match self.store.count_active_sources().await {
            Ok(0) => issues.push("no active news sources configured".to_string()),
            Ok(_) => {}
            Err(e) => issues.push(format!("source query failed: {e}")),
        }

        let since = chrono::Utc::now().timestamp() - STATUS_ERROR_WINDOW_SECS;
        match self.store.count_error_logs_since(since).await {
            Ok(n) if n > 5 => {
                issues.push(format!("{n} pipeline errors in the last 24 hours"))
            }
            Ok(_) => {}
            Err(e) => issues.push(format!("error-log query failed: {e}")),
        }

        HealthReport {
            healthy: issues.is_empty(),
            issues,
        }
    }

    /// Recent published articles for the catalogue UI, corruption-filtered.
    pub async fn recent_news(&self, limit: usize) -> Result<Vec<NewsArticle>> {
        let now = chrono::Utc::now().timestamp();
        self.store
            .list_published(limit, now + self.cfg.future_date_slop_secs())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_thresholds() {
        assert_eq!(health_from_error_count(0), SystemHealth::Healthy);
        assert_eq!(health_from_error_count(1), SystemHealth::Warning);
        assert_eq!(health_from_error_count(3), SystemHealth::Warning);
        assert_eq!(health_from_error_count(4), SystemHealth::Error);
    }
}
