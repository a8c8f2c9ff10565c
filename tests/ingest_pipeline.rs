// tests/ingest_pipeline.rs
//
// End-to-end fetch cycle against a fixture-backed fetcher: relevant items
// are inserted in pending, irrelevant ones filtered, and a second run over
// the same feed inserts nothing.

use ai_news_pipeline::config::PipelineConfig;
use ai_news_pipeline::error::Result;
use ai_news_pipeline::ingest::{self, fetch::FeedFetch};
use ai_news_pipeline::store::types::{ArticleStatus, NewSource, NewsSource};
use ai_news_pipeline::store::Store;
use async_trait::async_trait;

const FEED_XML: &str = include_str!("fixtures/ai_rss.xml");

struct FixtureFetcher;

#[async_trait]
impl FeedFetch for FixtureFetcher {
    async fn fetch(&self, _source: &NewsSource) -> Result<String> {
        Ok(FEED_XML.to_string())
    }
}

fn test_cfg() -> PipelineConfig {
    PipelineConfig {
        source_delay_ms: 0,
        ..PipelineConfig::default()
    }
}

async fn seeded_store() -> Store {
    let store = Store::open_in_memory().await.unwrap();
    store
        .upsert_source(NewSource {
            name: "AI Weekly".into(),
            url: "https://feeds.test/ai-weekly".into(),
        })
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn relevant_items_are_ingested_and_irrelevant_filtered() {
    let store = seeded_store().await;
    let report = ingest::run_fetch_cycle(&store, &FixtureFetcher, &test_cfg())
        .await
        .unwrap();

    // fixture: 2 relevant items, 1 bakery story
    assert_eq!(report.articles_fetched, 2);
    assert_eq!(report.errors, 0);

    let pending = store
        .count_articles_with_status(ArticleStatus::Pending)
        .await
        .unwrap();
    assert_eq!(pending, 2);
}

#[tokio::test]
async fn second_run_is_idempotent() {
    let store = seeded_store().await;
    let cfg = test_cfg();

    let first = ingest::run_fetch_cycle(&store, &FixtureFetcher, &cfg)
        .await
        .unwrap();
    assert_eq!(first.articles_fetched, 2);

    let second = ingest::run_fetch_cycle(&store, &FixtureFetcher, &cfg)
        .await
        .unwrap();
    assert_eq!(second.articles_fetched, 0, "already-seen source_urls skip");
    assert_eq!(second.errors, 0);
}

#[tokio::test]
async fn cycle_updates_the_source_checkpoint() {
    let store = seeded_store().await;
    assert_eq!(
        store.list_active_sources().await.unwrap()[0].last_fetched,
        None
    );

    ingest::run_fetch_cycle(&store, &FixtureFetcher, &test_cfg())
        .await
        .unwrap();

    let sources = store.list_active_sources().await.unwrap();
    assert!(sources[0].last_fetched.is_some());
}

#[tokio::test]
async fn atom_feed_ingests_the_same_articles() {
    let store = seeded_store().await;

    struct AtomFetcher;
    #[async_trait]
    impl FeedFetch for AtomFetcher {
        async fn fetch(&self, _source: &NewsSource) -> Result<String> {
            Ok(include_str!("fixtures/ai_atom.xml").to_string())
        }
    }

    let report = ingest::run_fetch_cycle(&store, &AtomFetcher, &test_cfg())
        .await
        .unwrap();
    assert_eq!(report.articles_fetched, 2);

    // The RSS rendition of the same stories dedups against the Atom one.
    let report = ingest::run_fetch_cycle(&store, &FixtureFetcher, &test_cfg())
        .await
        .unwrap();
    assert_eq!(report.articles_fetched, 0);
}
