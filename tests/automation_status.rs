// tests/automation_status.rs
//
// Derived status view: health transitions follow the recent-error count in
// a sliding 24h window, and next_scheduled_fetch derives from the latest
// completed fetch log.

use std::sync::Arc;

use ai_news_pipeline::automation::{AutomationController, SystemHealth};
use ai_news_pipeline::config::PipelineConfig;
use ai_news_pipeline::error::Result;
use ai_news_pipeline::ingest::fetch::FeedFetch;
use ai_news_pipeline::store::types::{LogStatus, NewsSource};
use ai_news_pipeline::store::Store;
use ai_news_pipeline::summary::ExtractiveEngine;
use async_trait::async_trait;

struct NullFetcher;

#[async_trait]
impl FeedFetch for NullFetcher {
    async fn fetch(&self, _source: &NewsSource) -> Result<String> {
        Ok(String::new())
    }
}

fn controller(store: Arc<Store>, cfg: PipelineConfig) -> AutomationController {
    AutomationController::new(store, Arc::new(NullFetcher), Arc::new(ExtractiveEngine), cfg)
}

#[tokio::test]
async fn health_degrades_monotonically_with_error_volume() {
    let store = Arc::new(Store::open_in_memory().await.unwrap());
    let ctl = controller(store.clone(), PipelineConfig::default());
    let now = chrono::Utc::now().timestamp();

    let status = ctl.status().await.unwrap();
    assert_eq!(status.system_health, SystemHealth::Healthy);

    store
        .append_log_at("fetch_ai_news", LogStatus::Error, "one error", None, now - 60)
        .await
        .unwrap();
    let status = ctl.status().await.unwrap();
    assert_eq!(status.system_health, SystemHealth::Warning);
    assert!(!status.errors.is_empty());

    for i in 0..3 {
        store
            .append_log_at(
                "fetch_ai_news",
                LogStatus::Error,
                &format!("error {i}"),
                None,
                now - 30,
            )
            .await
            .unwrap();
    }
    let status = ctl.status().await.unwrap();
    assert_eq!(status.system_health, SystemHealth::Error);
}

#[tokio::test]
async fn errors_older_than_the_window_stop_counting() {
    let store = Arc::new(Store::open_in_memory().await.unwrap());
    let ctl = controller(store.clone(), PipelineConfig::default());
    let now = chrono::Utc::now().timestamp();

    store
        .append_log_at(
            "fetch_ai_news",
            LogStatus::Error,
            "stale error",
            None,
            now - 25 * 3600,
        )
        .await
        .unwrap();

    let status = ctl.status().await.unwrap();
    assert_eq!(
        status.system_health,
        SystemHealth::Healthy,
        "a 25h-old error is outside the sliding window"
    );
}

#[tokio::test]
async fn next_fetch_derives_from_the_last_completed_log() {
    let store = Arc::new(Store::open_in_memory().await.unwrap());
    let cfg = PipelineConfig::default();
    let ctl = controller(store.clone(), cfg.clone());
    let now = chrono::Utc::now().timestamp();

    // Never run: next fetch is "now"
    let status = ctl.status().await.unwrap();
    assert!(status.last_fetch.is_none());
    assert!((status.next_scheduled_fetch - now).abs() <= 2);

    let t = now - 600;
    store
        .append_log_at("fetch_ai_news", LogStatus::Completed, "done", None, t)
        .await
        .unwrap();

    let status = ctl.status().await.unwrap();
    assert_eq!(status.last_fetch, Some(t));
    assert_eq!(
        status.next_scheduled_fetch,
        t + cfg.fetch_interval_secs() as i64
    );
}

#[tokio::test]
async fn started_log_without_completion_reports_running() {
    let store = Arc::new(Store::open_in_memory().await.unwrap());
    let ctl = controller(store.clone(), PipelineConfig::default());
    let now = chrono::Utc::now().timestamp();

    store
        .append_log_at("fetch_ai_news", LogStatus::Completed, "done", None, now - 100)
        .await
        .unwrap();
    store
        .append_log_at("fetch_ai_news", LogStatus::Started, "running", None, now - 5)
        .await
        .unwrap();

    let status = ctl.status().await.unwrap();
    assert!(status.is_running);
}

#[tokio::test]
async fn pending_articles_show_up_as_queue_depth() {
    let store = Arc::new(Store::open_in_memory().await.unwrap());
    let ctl = controller(store.clone(), PipelineConfig::default());
    let now = chrono::Utc::now().timestamp();

    store
        .insert_article(
            ai_news_pipeline::store::types::NewArticle {
                title: "AI story".into(),
                original_content: None,
                source_url: "https://news.test/queued".into(),
                source_name: "Test Feed".into(),
                published_at: now,
                tags: vec!["ai".into()],
            },
            now,
        )
        .await
        .unwrap();

    let status = ctl.status().await.unwrap();
    assert_eq!(status.articles_in_queue, 1);
}
