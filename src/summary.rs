// src/summary.rs
//! Downstream summary processing. The summarization content itself is an
//! external concern behind `SummaryEngine`; this module owns the article
//! lifecycle around it: claim pending -> processing, publish or fail.

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::types::LogStatus;
use crate::store::Store;

/// Operation name recorded in pipeline_logs for summary batches.
pub const OP_PROCESS_SUMMARIES: &str = "process_ai_summaries";

#[async_trait]
pub trait SummaryEngine: Send + Sync {
    async fn summarize(&self, title: &str, content: &str) -> anyhow::Result<String>;
    fn name(&self) -> &'static str;
}

/// Calls the configured external summarizer endpoint.
pub struct RemoteSummaryEngine {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    title: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
}

impl RemoteSummaryEngine {
    pub fn new(endpoint: String, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .user_agent(user_agent.to_string())
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SummaryEngine for RemoteSummaryEngine {
    async fn summarize(&self, title: &str, content: &str) -> anyhow::Result<String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&SummarizeRequest { title, content })
            .send()
            .await?
            .error_for_status()?;
        let body: SummarizeResponse = resp.json().await?;
        Ok(body.summary)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

/// Fallback when no summarizer endpoint is configured: the first sentences
/// of the original content, capped.
pub struct ExtractiveEngine;

const EXTRACTIVE_MAX_CHARS: usize = 400;

#[async_trait]
impl SummaryEngine for ExtractiveEngine {
    async fn summarize(&self, _title: &str, content: &str) -> anyhow::Result<String> {
        let mut out = String::new();
        for sentence in content.split_inclusive(". ").take(2) {
            out.push_str(sentence);
        }
        let mut out = out.trim().to_string();
        if out.chars().count() > EXTRACTIVE_MAX_CHARS {
            out = out.chars().take(EXTRACTIVE_MAX_CHARS).collect();
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "extractive"
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SummaryReport {
    pub processed: usize,
    pub failed: usize,
}

/// Process one batch of pending articles: claim up to `max_batch`, summarize
/// each, publish on success, mark failed otherwise. Per-article failures are
/// isolated and counted.
pub async fn process_summaries(
    store: &Store,
    engine: &dyn SummaryEngine,
    max_batch: usize,
) -> Result<SummaryReport> {
    store
        .append_log(
            OP_PROCESS_SUMMARIES,
            LogStatus::Started,
            "summary batch started",
            None,
        )
        .await?;

    let now = chrono::Utc::now().timestamp();
    let claimed = store.claim_pending(max_batch, now).await?;

    let mut processed = 0usize;
    let mut failed = 0usize;

    for article in &claimed {
        let content = article
            .original_content
            .as_deref()
            .unwrap_or(&article.title);
        match engine.summarize(&article.title, content).await {
            Ok(summary) => {
                let ts = chrono::Utc::now().timestamp();
                if store.publish_article(article.id, summary, ts).await? {
                    processed += 1;
                }
            }
            Err(e) => {
                tracing::warn!(error = ?e, article_id = article.id, engine = engine.name(), "summarization failed");
                let ts = chrono::Utc::now().timestamp();
                store.fail_article(article.id, ts).await?;
                failed += 1;
                if let Err(log_err) = store
                    .append_log(
                        OP_PROCESS_SUMMARIES,
                        LogStatus::Error,
                        &format!("summarization failed for article {}: {e}", article.id),
                        None,
                    )
                    .await
                {
                    tracing::warn!(error = ?log_err, "pipeline log write failed");
                }
            }
        }
    }

    counter!("news_summaries_processed_total").increment(processed as u64);

    let report = SummaryReport { processed, failed };
    store
        .append_log(
            OP_PROCESS_SUMMARIES,
            LogStatus::Completed,
            &format!("Processed {} articles ({} failed)", processed, failed),
            Some(serde_json::json!({
                "processed": processed,
                "failed": failed,
            })),
        )
        .await?;

    Ok(report)
}
