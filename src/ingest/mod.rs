// src/ingest/mod.rs
//! Ingestion orchestrator: iterates active sources, runs
//! fetch -> parse -> classify -> tag -> insert per source with failure
//! isolation, checkpoints sources, and logs aggregate outcomes.

pub mod classify;
pub mod fetch;
pub mod parser;
pub mod tags;

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::ingest::fetch::FeedFetch;
use crate::ingest::parser::FeedItem;
use crate::store::types::{LogStatus, NewArticle, NewsSource};
use crate::store::Store;

/// Operation name recorded in pipeline_logs for fetch cycles.
pub const OP_FETCH_NEWS: &str = "fetch_ai_news";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_fetch_runs_total", "Completed fetch cycles.");
        describe_counter!("news_items_parsed_total", "Items parsed from feeds.");
        describe_counter!(
            "news_articles_ingested_total",
            "New articles inserted in pending."
        );
        describe_counter!(
            "news_articles_duplicate_total",
            "Items skipped because their source_url already exists."
        );
        describe_counter!(
            "news_articles_filtered_total",
            "Items dropped by the relevance gate or missing a link."
        );
        describe_counter!(
            "news_source_errors_total",
            "Per-source fetch/parse/insert errors."
        );
        describe_histogram!("news_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "news_pipeline_last_run_ts",
            "Unix ts when the fetch cycle last completed."
        );
    });
}

/// Normalize feed text: entity decode, tag strip, quote fix, whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize curly quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 2000 chars
    if out.chars().count() > 2000 {
        out = out.chars().take(2000).collect();
    }

    out
}

/// Char-boundary-safe title truncation.
pub fn truncate_title(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        s.chars().take(max_chars).collect()
    } else {
        s.to_string()
    }
}

/// Short stable hash for debug logs; raw titles/urls stay out of log lines.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct FetchCycleReport {
    pub articles_fetched: usize,
    pub errors: usize,
}

enum ItemOutcome {
    Inserted,
    Duplicate,
    Filtered,
}

/// Run one full fetch cycle over all active sources. A single source
/// failing (network, parse, insert) is isolated; only a failure to read
/// the source list or write the top-level log aborts the cycle.
pub async fn run_fetch_cycle(
    store: &Store,
    fetcher: &dyn FeedFetch,
    cfg: &PipelineConfig,
) -> Result<FetchCycleReport> {
    ensure_metrics_described();

    store
        .append_log(OP_FETCH_NEWS, LogStatus::Started, "fetch cycle started", None)
        .await?;

    let sources = match store.list_active_sources().await {
        Ok(s) => s,
        Err(e) => {
            log_soft(
                store,
                LogStatus::Error,
                &format!("failed to read source list: {e}"),
            )
            .await;
            return Err(e);
        }
    };

    let mut articles_fetched = 0usize;
    let mut errors = 0usize;

    for (i, source) in sources.iter().enumerate() {
        // Politeness delay between sources; feed hosts rate-limit eagerly.
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(cfg.source_delay_ms)).await;
        }

        let raw = match fetcher.fetch(source).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = ?e, source = %source.name, "source fetch failed");
                counter!("news_source_errors_total").increment(1);
                errors += 1;
                log_soft(
                    store,
                    LogStatus::Error,
                    &format!("fetch failed for {}: {e}", source.name),
                )
                .await;
                continue;
            }
        };

        let items = match parser::parse_feed(&raw, &source.name) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, source = %source.name, "feed parse failed");
                counter!("news_source_errors_total").increment(1);
                errors += 1;
                log_soft(
                    store,
                    LogStatus::Error,
                    &format!("parse failed for {}: {e}", source.name),
                )
                .await;
                continue;
            }
        };

        tracing::debug!(target: "ingest", source = %source.name, items = items.len(), "parsed feed");

        for item in &items {
            match ingest_item(store, source, item, cfg).await {
                Ok(ItemOutcome::Inserted) => {
                    articles_fetched += 1;
                    counter!("news_articles_ingested_total").increment(1);
                }
                Ok(ItemOutcome::Duplicate) => {
                    counter!("news_articles_duplicate_total").increment(1);
                }
                Ok(ItemOutcome::Filtered) => {
                    counter!("news_articles_filtered_total").increment(1);
                }
                Err(e) => {
                    tracing::warn!(error = ?e, source = %source.name, "article insert failed");
                    counter!("news_source_errors_total").increment(1);
                    errors += 1;
                    log_soft(
                        store,
                        LogStatus::Error,
                        &format!("insert failed for {}: {e}", source.name),
                    )
                    .await;
                }
            }
        }

        let now = chrono::Utc::now().timestamp();
        if let Err(e) = store.mark_source_fetched(source.id, now).await {
            tracing::warn!(error = ?e, source = %source.name, "checkpoint update failed");
            errors += 1;
        }
    }

    let now = chrono::Utc::now().timestamp();
    counter!("news_fetch_runs_total").increment(1);
    gauge!("news_pipeline_last_run_ts").set(now as f64);

    let report = FetchCycleReport {
        articles_fetched,
        errors,
    };
    store
        .append_log(
            OP_FETCH_NEWS,
            LogStatus::Completed,
            &format!(
                "Fetched {} new articles ({} errors)",
                report.articles_fetched, report.errors
            ),
            Some(serde_json::json!({
                "articles_fetched": report.articles_fetched,
                "errors": report.errors,
                "sources": sources.len(),
            })),
        )
        .await?;

    tracing::info!(
        target: "ingest",
        fetched = report.articles_fetched,
        errors = report.errors,
        sources = sources.len(),
        "fetch cycle complete"
    );

    Ok(report)
}

async fn ingest_item(
    store: &Store,
    source: &NewsSource,
    item: &FeedItem,
    cfg: &PipelineConfig,
) -> Result<ItemOutcome> {
    // No link means no canonical dedup key; the item cannot be ingested
    // idempotently.
    let Some(link) = item.link.as_deref() else {
        tracing::debug!(target: "ingest", id = %anon_hash(&item.title), "item without link skipped");
        return Ok(ItemOutcome::Filtered);
    };

    if store.article_exists(link).await? {
        return Ok(ItemOutcome::Duplicate);
    }

    if !classify::is_relevant(&item.title, &item.description) {
        tracing::debug!(target: "ingest", id = %anon_hash(link), "item not relevant, skipped");
        return Ok(ItemOutcome::Filtered);
    }

    let tags: Vec<String> = tags::extract_tags(&item.title, &item.description)
        .into_iter()
        .collect();

    let now = chrono::Utc::now().timestamp();
    let article = NewArticle {
        title: truncate_title(&item.title, cfg.title_max_len),
        original_content: (!item.description.is_empty()).then(|| item.description.clone()),
        source_url: link.to_string(),
        source_name: source.name.clone(),
        // The feed's claimed date is stored as-is; implausible dates are a
        // read-time filter and a cleanup target.
        published_at: item.published_at.unwrap_or(now),
        tags,
    };

    match store.insert_article(article, now).await? {
        Some(_) => Ok(ItemOutcome::Inserted),
        // A concurrent cycle won the unique-constraint race.
        None => Ok(ItemOutcome::Duplicate),
    }
}

/// Best-effort error logging; a log write failing must not mask the error
/// being reported.
async fn log_soft(store: &Store, status: LogStatus, message: &str) {
    if let Err(e) = store.append_log(OP_FETCH_NEWS, status, message, None).await {
        tracing::warn!(error = ?e, "pipeline log write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "<b>Hello&nbsp;&nbsp; world</b> &amp; more";
        assert_eq!(normalize_text(s), "Hello world & more");
    }

    #[test]
    fn normalize_text_fixes_curly_quotes() {
        let s = "\u{201C}AI\u{201D} won\u{2019}t wait";
        assert_eq!(normalize_text(s), "\"AI\" won't wait");
    }

    #[test]
    fn truncate_title_is_char_boundary_safe() {
        let s = "čeština ".repeat(100);
        let t = truncate_title(&s, 255);
        assert_eq!(t.chars().count(), 255);
        // must not panic on multi-byte boundaries
        let _ = truncate_title("ズームレンズ", 3);
    }

    #[test]
    fn short_titles_pass_through_unchanged() {
        assert_eq!(truncate_title("short", 255), "short");
    }

    #[test]
    fn anon_hash_is_stable_and_short() {
        assert_eq!(anon_hash("x"), anon_hash("x"));
        assert_eq!(anon_hash("x").len(), 12);
        assert_ne!(anon_hash("x"), anon_hash("y"));
    }
}
