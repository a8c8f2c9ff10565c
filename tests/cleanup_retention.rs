// tests/cleanup_retention.rs
//
// Retention boundary rule: deletes are strictly older than the cutoff, so a
// row exactly at the boundary is retained. The controller pass exercises all
// three deletions together.

use std::sync::Arc;

use ai_news_pipeline::automation::AutomationController;
use ai_news_pipeline::config::PipelineConfig;
use ai_news_pipeline::error::Result;
use ai_news_pipeline::ingest::fetch::FeedFetch;
use ai_news_pipeline::store::types::{ArticleStatus, LogStatus, NewArticle, NewsSource};
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

fn article(url: &str, title: &str, published_at: i64) -> NewArticle {
    NewArticle {
        title: title.into(),
        original_content: None,
        source_url: url.into(),
        source_name: "Test Feed".into(),
        published_at,
        tags: vec!["ai".into()],
    }
}

#[tokio::test]
async fn log_purge_boundary_is_exclusive() {
    let store = Store::open_in_memory().await.unwrap();
    let cutoff = 1_700_000_000;

    store
        .append_log_at("fetch_ai_news", LogStatus::Error, "older", None, cutoff - 1)
        .await
        .unwrap();
    store
        .append_log_at("fetch_ai_news", LogStatus::Error, "boundary", None, cutoff)
        .await
        .unwrap();
    store
        .append_log_at("fetch_ai_news", LogStatus::Error, "newer", None, cutoff + 1)
        .await
        .unwrap();

    let purged = store.purge_logs_before(cutoff).await.unwrap();
    assert_eq!(purged, 1, "only the strictly-older row goes");

    let remaining = store.count_error_logs_since(0).await.unwrap();
    assert_eq!(remaining, 2, "boundary row is retained");
}

#[tokio::test]
async fn failed_article_boundary_is_exclusive() {
    let store = Store::open_in_memory().await.unwrap();
    let cutoff = 1_700_000_000;

    // created_at comes from the insert timestamp
    let a = store
        .insert_article(article("https://news.test/a", "AI story a", 100), cutoff - 1)
        .await
        .unwrap()
        .unwrap();
    let b = store
        .insert_article(article("https://news.test/b", "AI story b", 100), cutoff)
        .await
        .unwrap()
        .unwrap();
    for id in [a, b] {
        store.fail_article(id, cutoff).await.unwrap();
    }

    let deleted = store.delete_failed_before(cutoff).await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(
        store
            .count_articles_with_status(ArticleStatus::Failed)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn controller_cleanup_removes_old_and_corrupted_data() {
    let store = Arc::new(Store::open_in_memory().await.unwrap());
    let cfg = PipelineConfig {
        source_delay_ms: 0,
        ..PipelineConfig::default()
    };
    let controller = AutomationController::new(
        store.clone(),
        Arc::new(NullFetcher),
        Arc::new(ExtractiveEngine),
        cfg.clone(),
    );

    let now = chrono::Utc::now().timestamp();
    let day = 86_400;

    // Logs: one comfortably past retention, one recent.
    store
        .append_log_at("fetch_ai_news", LogStatus::Error, "ancient", None, now - 31 * day)
        .await
        .unwrap();
    store
        .append_log_at("fetch_ai_news", LogStatus::Error, "recent", None, now - day)
        .await
        .unwrap();

    // Failed articles: 8 days old (deleted) vs 6 days old (kept).
    let stale = store
        .insert_article(article("https://news.test/stale", "AI stale", now), now - 8 * day)
        .await
        .unwrap()
        .unwrap();
    let fresh = store
        .insert_article(article("https://news.test/fresh", "AI fresh", now), now - 6 * day)
        .await
        .unwrap()
        .unwrap();
    for id in [stale, fresh] {
        store.fail_article(id, now).await.unwrap();
    }

    // Corruption signatures: far-future date; mis-decoded entities in title.
    store
        .insert_article(
            article("https://news.test/future", "AI future", now + 30 * day),
            now,
        )
        .await
        .unwrap();
    store
        .insert_article(
            article("https://news.test/garbled", "AI wins &#039;award&#039;", now),
            now,
        )
        .await
        .unwrap();

    let result = controller.perform_cleanup().await;
    assert!(result.success, "cleanup failed: {}", result.message);

    assert_eq!(store.count_error_logs_since(0).await.unwrap(), 1);
    assert_eq!(
        store
            .count_articles_with_status(ArticleStatus::Failed)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        store
            .count_articles_with_status(ArticleStatus::Pending)
            .await
            .unwrap(),
        0,
        "both corrupted articles are deleted"
    );
}
