// tests/ingest_partial_failure.rs
//
// One bad source must not take down the cycle: with three configured
// sources and the middle one failing, the other two still ingest and the
// report carries the error count.

use ai_news_pipeline::config::PipelineConfig;
use ai_news_pipeline::error::{PipelineError, Result};
use ai_news_pipeline::ingest::{self, fetch::FeedFetch};
use ai_news_pipeline::store::types::{ArticleStatus, NewSource, NewsSource};
use ai_news_pipeline::store::Store;
use async_trait::async_trait;

fn rss_feed(slug: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>{slug}</title>
<item>
  <title>Machine learning breakthrough at {slug}</title>
  <link>https://news.test/{slug}/ml-breakthrough</link>
  <description>New deep learning results.</description>
  <pubDate>Mon, 03 Mar 2025 09:00:00 GMT</pubDate>
</item>
</channel></rss>"#
    )
}

struct FlakyFetcher;

#[async_trait]
impl FeedFetch for FlakyFetcher {
    async fn fetch(&self, source: &NewsSource) -> Result<String> {
        if source.url.contains("unreachable") {
            return Err(PipelineError::Fetch {
                url: source.url.clone(),
                status: 503,
            });
        }
        let slug = source.name.to_lowercase().replace(' ', "-");
        Ok(rss_feed(&slug))
    }
}

#[tokio::test]
async fn failing_source_is_isolated() {
    let store = Store::open_in_memory().await.unwrap();
    for (name, url) in [
        ("Alpha Feed", "https://feeds.test/alpha"),
        ("Broken Feed", "https://feeds.test/unreachable"),
        ("Gamma Feed", "https://feeds.test/gamma"),
    ] {
        store
            .upsert_source(NewSource {
                name: name.into(),
                url: url.into(),
            })
            .await
            .unwrap();
    }

    let cfg = PipelineConfig {
        source_delay_ms: 0,
        ..PipelineConfig::default()
    };
    let report = ingest::run_fetch_cycle(&store, &FlakyFetcher, &cfg)
        .await
        .unwrap();

    assert_eq!(report.articles_fetched, 2, "sources #1 and #3 still insert");
    assert!(report.errors >= 1, "the broken source is counted");

    let pending = store
        .count_articles_with_status(ArticleStatus::Pending)
        .await
        .unwrap();
    assert_eq!(pending, 2);
}

#[tokio::test]
async fn malformed_feed_is_isolated_too() {
    let store = Store::open_in_memory().await.unwrap();
    for (name, url) in [
        ("Alpha Feed", "https://feeds.test/alpha"),
        ("Garbled Feed", "https://feeds.test/garbled"),
    ] {
        store
            .upsert_source(NewSource {
                name: name.into(),
                url: url.into(),
            })
            .await
            .unwrap();
    }

    struct GarbledFetcher;
    #[async_trait]
    impl FeedFetch for GarbledFetcher {
        async fn fetch(&self, source: &NewsSource) -> Result<String> {
            if source.url.contains("garbled") {
                Ok("not xml at all <<<".to_string())
            } else {
                Ok(rss_feed("alpha-feed"))
            }
        }
    }

    let cfg = PipelineConfig {
        source_delay_ms: 0,
        ..PipelineConfig::default()
    };
    let report = ingest::run_fetch_cycle(&store, &GarbledFetcher, &cfg)
        .await
        .unwrap();

    assert_eq!(report.articles_fetched, 1);
    assert_eq!(report.errors, 1);
}
