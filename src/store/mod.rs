// src/store/mod.rs
//! SQLite-backed store for sources, articles, and the append-only pipeline
//! log. All access goes through `conn.call` closures on a single background
//! connection; mutations fan out `StoreEvent`s on a broadcast channel for
//! the realtime monitor.

pub mod schema;
pub mod types;

use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio::sync::broadcast;
use tokio_rusqlite::Connection;

use crate::error::Result;
use schema::SCHEMA;
use types::{
    ArticleStatus, LogEntry, LogStatus, NewArticle, NewSource, NewsArticle, NewsSource, StoreEvent,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct Store {
    conn: Connection,
    events: broadcast::Sender<StoreEvent>,
}

impl Store {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    /// In-memory store for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self { conn, events })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Cheap connectivity probe used by initialize() and health checks.
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    fn emit(&self, event: StoreEvent) {
        // Nobody listening is fine; monitoring is optional.
        let _ = self.events.send(event);
    }

    // Source operations

    pub async fn list_active_sources(&self) -> Result<Vec<NewsSource>> {
        let sources = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, url, source_type, is_active, last_fetched, fetch_interval_minutes
                     FROM sources WHERE is_active = 1 ORDER BY id",
                )?;
                let sources = stmt
                    .query_map([], |row| source_from_row(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(sources)
            })
            .await?;
        Ok(sources)
    }

    pub async fn count_active_sources(&self) -> Result<i64> {
        let n = self
            .conn
            .call(|conn| {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sources WHERE is_active = 1",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await?;
        Ok(n)
    }

    /// Upsert by URL, reactivating and renaming in place. `last_fetched`
    /// survives the upsert so reseeding never loses checkpoints.
    pub async fn upsert_source(&self, source: NewSource) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sources (name, url, source_type, is_active)
                     VALUES (?1, ?2, 'rss', 1)
                     ON CONFLICT(url) DO UPDATE SET
                         name = excluded.name,
                         is_active = 1",
                    params![source.name, source.url],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Deactivate every source whose URL is not in `keep_urls`.
    pub async fn deactivate_sources_not_in(&self, keep_urls: Vec<String>) -> Result<usize> {
        let n = self
            .conn
            .call(move |conn| {
                if keep_urls.is_empty() {
                    let n = conn.execute("UPDATE sources SET is_active = 0", [])?;
                    return Ok(n);
                }
                let placeholders = vec!["?"; keep_urls.len()].join(", ");
                let sql = format!(
                    "UPDATE sources SET is_active = 0 WHERE url NOT IN ({placeholders})"
                );
                let n = conn.execute(&sql, params_from_iter(keep_urls.iter()))?;
                Ok(n)
            })
            .await?;
        Ok(n)
    }

    pub async fn mark_source_fetched(&self, id: i64, ts: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE sources SET last_fetched = ?1 WHERE id = ?2",
                    params![ts, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Article operations

    pub async fn article_exists(&self, source_url: &str) -> Result<bool> {
        let url = source_url.to_string();
        let found = self
            .conn
            .call(move |conn| {
                let id: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM articles WHERE source_url = ?1",
                        params![url],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(id.is_some())
            })
            .await?;
        Ok(found)
    }

    /// Insert a new article in `pending`. Returns `None` when an article with
    /// the same `source_url` already exists (conflict treated as dedup, not
    /// an error).
    pub async fn insert_article(&self, article: NewArticle, now: i64) -> Result<Option<i64>> {
        let source_name = article.source_name.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                let tags_json =
                    serde_json::to_string(&article.tags).unwrap_or_else(|_| "[]".to_string());
                let changed = conn.execute(
                    "INSERT INTO articles
                         (title, original_content, source_url, source_name, published_at,
                          status, tags, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?7)
                     ON CONFLICT(source_url) DO NOTHING",
                    params![
                        article.title,
                        article.original_content,
                        article.source_url,
                        article.source_name,
                        article.published_at,
                        tags_json,
                        now,
                    ],
                )?;
                if changed == 0 {
                    Ok(None)
                } else {
                    Ok(Some(conn.last_insert_rowid()))
                }
            })
            .await?;

        if let Some(id) = inserted {
            self.emit(StoreEvent::ArticleInserted { id, source_name });
        }
        Ok(inserted)
    }

    pub async fn count_articles_with_status(&self, status: ArticleStatus) -> Result<i64> {
        let n = self
            .conn
            .call(move |conn| {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM articles WHERE status = ?1",
                    params![status.as_str()],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await?;
        Ok(n)
    }

    /// Move up to `limit` pending articles to `processing` and return them,
    /// oldest first. The guarded UPDATE keeps the lifecycle forward-only.
    pub async fn claim_pending(&self, limit: usize, now: i64) -> Result<Vec<NewsArticle>> {
        let claimed = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, original_content, summary, source_url, source_name,
                            published_at, status, featured, view_count, tags,
                            influence_score, education_relevance, created_at, updated_at
                     FROM articles WHERE status = 'pending'
                     ORDER BY created_at ASC, id ASC LIMIT ?1",
                )?;
                let mut articles = stmt
                    .query_map(params![limit as i64], |row| article_from_row(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                for a in articles.iter_mut() {
                    conn.execute(
                        "UPDATE articles SET status = 'processing', updated_at = ?1
                         WHERE id = ?2 AND status = 'pending'",
                        params![now, a.id],
                    )?;
                    a.status = ArticleStatus::Processing;
                    a.updated_at = now;
                }
                Ok(articles)
            })
            .await?;

        for a in &claimed {
            self.emit(StoreEvent::ArticleStatusChanged {
                id: a.id,
                status: ArticleStatus::Processing,
            });
        }
        Ok(claimed)
    }

    /// processing -> published. Returns false if the article was not in
    /// `processing` (the lifecycle never regresses).
    pub async fn publish_article(&self, id: i64, summary: String, now: i64) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE articles SET status = 'published', summary = ?1, updated_at = ?2
                     WHERE id = ?3 AND status = 'processing'",
                    params![summary, now, id],
                )?;
                Ok(n > 0)
            })
            .await?;
        if changed {
            self.emit(StoreEvent::ArticleStatusChanged {
                id,
                status: ArticleStatus::Published,
            });
        }
        Ok(changed)
    }

    /// pending/processing -> failed.
    pub async fn fail_article(&self, id: i64, now: i64) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE articles SET status = 'failed', updated_at = ?1
                     WHERE id = ?2 AND status IN ('pending', 'processing')",
                    params![now, id],
                )?;
                Ok(n > 0)
            })
            .await?;
        if changed {
            self.emit(StoreEvent::ArticleStatusChanged {
                id,
                status: ArticleStatus::Failed,
            });
        }
        Ok(changed)
    }

    /// Read query for the presentation layer. Corrupted rows (implausibly
    /// future-dated or with raw entity fragments in the title) are filtered
    /// here; cleanup deletes them for good.
    pub async fn list_published(
        &self,
        limit: usize,
        max_plausible_ts: i64,
    ) -> Result<Vec<NewsArticle>> {
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, original_content, summary, source_url, source_name,
                            published_at, status, featured, view_count, tags,
                            influence_score, education_relevance, created_at, updated_at
                     FROM articles
                     WHERE status = 'published'
                       AND published_at <= ?1
                       AND title NOT LIKE '%&#%'
                     ORDER BY published_at DESC LIMIT ?2",
                )?;
                let articles = stmt
                    .query_map(params![max_plausible_ts, limit as i64], |row| {
                        article_from_row(row)
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    /// Delete failed articles strictly older than `cutoff`.
    pub async fn delete_failed_before(&self, cutoff: i64) -> Result<usize> {
        let n = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "DELETE FROM articles WHERE status = 'failed' AND created_at < ?1",
                    params![cutoff],
                )?;
                Ok(n)
            })
            .await?;
        Ok(n)
    }

    /// Delete articles matching the corruption signature: claimed publish
    /// date beyond the plausibility bound, or a mis-decoded entity fragment
    /// left in the title by a broken upstream encoder.
    pub async fn delete_corrupted(&self, max_plausible_ts: i64) -> Result<usize> {
        let n = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "DELETE FROM articles WHERE published_at > ?1 OR title LIKE '%&#%'",
                    params![max_plausible_ts],
                )?;
                Ok(n)
            })
            .await?;
        Ok(n)
    }

    // Pipeline log operations

    pub async fn append_log(
        &self,
        operation: &str,
        status: LogStatus,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();
        self.append_log_at(operation, status, message, details, now).await
    }

    /// Append with an explicit timestamp. Retention and health logic are
    /// pure functions over `created_at`, so tests drive the clock here.
    pub async fn append_log_at(
        &self,
        operation: &str,
        status: LogStatus,
        message: &str,
        details: Option<serde_json::Value>,
        created_at: i64,
    ) -> Result<i64> {
        let operation = operation.to_string();
        let message = message.to_string();
        let op_for_event = operation.clone();
        let id = self
            .conn
            .call(move |conn| {
                let details_json = details.map(|d| d.to_string());
                conn.execute(
                    "INSERT INTO pipeline_logs (operation, status, message, details, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![operation, status.as_str(), message, details_json, created_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        self.emit(StoreEvent::LogAppended {
            operation: op_for_event,
            status,
        });
        Ok(id)
    }

    pub async fn latest_log(&self, operation: &str) -> Result<Option<LogEntry>> {
        let operation = operation.to_string();
        let entry = self
            .conn
            .call(move |conn| {
                let entry = conn
                    .query_row(
                        "SELECT id, operation, status, message, details, created_at
                         FROM pipeline_logs WHERE operation = ?1
                         ORDER BY created_at DESC, id DESC LIMIT 1",
                        params![operation],
                        |row| log_from_row(row),
                    )
                    .optional()?;
                Ok(entry)
            })
            .await?;
        Ok(entry)
    }

    pub async fn latest_completed(&self, operation: &str) -> Result<Option<LogEntry>> {
        let operation = operation.to_string();
        let entry = self
            .conn
            .call(move |conn| {
                let entry = conn
                    .query_row(
                        "SELECT id, operation, status, message, details, created_at
                         FROM pipeline_logs WHERE operation = ?1 AND status = 'completed'
                         ORDER BY created_at DESC, id DESC LIMIT 1",
                        params![operation],
                        |row| log_from_row(row),
                    )
                    .optional()?;
                Ok(entry)
            })
            .await?;
        Ok(entry)
    }

    pub async fn count_error_logs_since(&self, since: i64) -> Result<i64> {
        let n = self
            .conn
            .call(move |conn| {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM pipeline_logs
                     WHERE status = 'error' AND created_at >= ?1",
                    params![since],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await?;
        Ok(n)
    }

    pub async fn recent_error_messages(&self, since: i64, limit: usize) -> Result<Vec<String>> {
        let messages = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT message FROM pipeline_logs
                     WHERE status = 'error' AND created_at >= ?1
                     ORDER BY created_at DESC, id DESC LIMIT ?2",
                )?;
                let messages = stmt
                    .query_map(params![since, limit as i64], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(messages)
            })
            .await?;
        Ok(messages)
    }

    /// Delete log rows strictly older than `cutoff`. A row with
    /// `created_at == cutoff` is retained.
    pub async fn purge_logs_before(&self, cutoff: i64) -> Result<usize> {
        let n = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "DELETE FROM pipeline_logs WHERE created_at < ?1",
                    params![cutoff],
                )?;
                Ok(n)
            })
            .await?;
        Ok(n)
    }
}

fn source_from_row(row: &Row) -> std::result::Result<NewsSource, rusqlite::Error> {
    Ok(NewsSource {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        source_type: row.get(3)?,
        is_active: row.get::<_, i64>(4)? != 0,
        last_fetched: row.get(5)?,
        fetch_interval_minutes: row.get(6)?,
    })
}

fn article_from_row(row: &Row) -> std::result::Result<NewsArticle, rusqlite::Error> {
    let status_raw: String = row.get(7)?;
    let tags_raw: String = row.get(10)?;
    Ok(NewsArticle {
        id: row.get(0)?,
        title: row.get(1)?,
        original_content: row.get(2)?,
        summary: row.get(3)?,
        source_url: row.get(4)?,
        source_name: row.get(5)?,
        published_at: row.get(6)?,
        status: ArticleStatus::parse(&status_raw).unwrap_or(ArticleStatus::Pending),
        featured: row.get::<_, i64>(8)? != 0,
        view_count: row.get(9)?,
        tags: serde_json::from_str(&tags_raw).unwrap_or_default(),
        influence_score: row.get(11)?,
        education_relevance: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn log_from_row(row: &Row) -> std::result::Result<LogEntry, rusqlite::Error> {
    let status_raw: String = row.get(2)?;
    let details_raw: Option<String> = row.get(4)?;
    Ok(LogEntry {
        id: row.get(0)?,
        operation: row.get(1)?,
        status: LogStatus::parse(&status_raw).unwrap_or(LogStatus::Error),
        message: row.get(3)?,
        details: details_raw.and_then(|d| serde_json::from_str(&d).ok()),
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_article(url: &str) -> NewArticle {
        NewArticle {
            title: "OpenAI releases a new model".into(),
            original_content: Some("Details about the release.".into()),
            source_url: url.into(),
            source_name: "Test Feed".into(),
            published_at: 1_700_000_000,
            tags: vec!["ai".into(), "openai".into()],
        }
    }

    #[tokio::test]
    async fn insert_is_idempotent_by_source_url() {
        let store = Store::open_in_memory().await.unwrap();
        let first = store
            .insert_article(sample_article("https://example.test/a"), 1_700_000_100)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .insert_article(sample_article("https://example.test/a"), 1_700_000_200)
            .await
            .unwrap();
        assert!(second.is_none(), "same source_url must not insert twice");
    }

    #[tokio::test]
    async fn status_lifecycle_never_regresses() {
        let store = Store::open_in_memory().await.unwrap();
        let id = store
            .insert_article(sample_article("https://example.test/b"), 100)
            .await
            .unwrap()
            .unwrap();

        // pending -> published directly is refused
        assert!(!store.publish_article(id, "s".into(), 200).await.unwrap());

        let claimed = store.claim_pending(10, 150).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].status, ArticleStatus::Processing);

        assert!(store.publish_article(id, "summary".into(), 200).await.unwrap());
        // published -> failed is refused
        assert!(!store.fail_article(id, 300).await.unwrap());
    }

    #[tokio::test]
    async fn upsert_source_preserves_checkpoint() {
        let store = Store::open_in_memory().await.unwrap();
        store
            .upsert_source(NewSource {
                name: "Feed A".into(),
                url: "https://a.test/rss".into(),
            })
            .await
            .unwrap();
        let id = store.list_active_sources().await.unwrap()[0].id;
        store.mark_source_fetched(id, 42).await.unwrap();

        store
            .upsert_source(NewSource {
                name: "Feed A (renamed)".into(),
                url: "https://a.test/rss".into(),
            })
            .await
            .unwrap();

        let sources = store.list_active_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "Feed A (renamed)");
        assert_eq!(sources[0].last_fetched, Some(42));
    }

    #[tokio::test]
    async fn published_read_filters_corrupted_rows() {
        let store = Store::open_in_memory().await.unwrap();
        let now = 1_700_000_000;

        let mut ok = sample_article("https://example.test/ok");
        ok.published_at = now - 10;
        let mut future = sample_article("https://example.test/future");
        future.published_at = now + 1_000_000;
        let mut garbled = sample_article("https://example.test/garbled");
        garbled.title = "AI wins &#039;award&#039;".into();
        garbled.published_at = now - 20;

        for a in [ok, future, garbled] {
            let id = store.insert_article(a, now).await.unwrap().unwrap();
            store.claim_pending(10, now).await.unwrap();
            store.publish_article(id, "s".into(), now).await.unwrap();
        }

        let visible = store.list_published(50, now + 3600).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].source_url, "https://example.test/ok");
    }
}
