// src/ingest/fetch.rs
use std::time::Duration;

use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::store::types::NewsSource;

/// Mime types we ask feed hosts for, most specific first.
const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.8, */*;q=0.5";

/// Retrieval seam for the orchestrator. Tests swap in fixture-backed mocks.
#[async_trait]
pub trait FeedFetch: Send + Sync {
    async fn fetch(&self, source: &NewsSource) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// The per-request timeout keeps one unresponsive host from starving
    /// the rest of the cycle.
    pub fn new(cfg: &PipelineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(|e| PipelineError::Configuration(format!("building http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetch for HttpFetcher {
    async fn fetch(&self, source: &NewsSource) -> Result<String> {
        let resp = self
            .client
            .get(&source.url)
            .header(reqwest::header::ACCEPT, FEED_ACCEPT)
            .send()
            .await
            .map_err(|e| PipelineError::Network {
                url: source.url.clone(),
                source: e,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Fetch {
                url: source.url.clone(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| PipelineError::Network {
            url: source.url.clone(),
            source: e,
        })
    }
}
