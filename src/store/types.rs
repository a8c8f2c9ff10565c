// src/store/types.rs
use serde::{Deserialize, Serialize};

/// A configured feed endpoint plus its polling checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsSource {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub source_type: String,
    pub is_active: bool,
    pub last_fetched: Option<i64>,
    /// Advisory hint only; the scheduler runs on the global interval.
    pub fetch_interval_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSource {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Pending,
    Processing,
    Published,
    Failed,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Processing => "processing",
            ArticleStatus::Published => "published",
            ArticleStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ArticleStatus::Pending),
            "processing" => Some(ArticleStatus::Processing),
            "published" => Some(ArticleStatus::Published),
            "failed" => Some(ArticleStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsArticle {
    pub id: i64,
    pub title: String,
    pub original_content: Option<String>,
    pub summary: Option<String>,
    pub source_url: String,
    pub source_name: String,
    pub published_at: i64,
    pub status: ArticleStatus,
    pub featured: bool,
    pub view_count: i64,
    pub tags: Vec<String>,
    pub influence_score: Option<f64>,
    pub education_relevance: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Insert payload produced by the orchestrator. Status starts at `pending`.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub original_content: Option<String>,
    pub source_url: String,
    pub source_name: String,
    pub published_at: i64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Started,
    Completed,
    Error,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Started => "started",
            LogStatus::Completed => "completed",
            LogStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "started" => Some(LogStatus::Started),
            "completed" => Some(LogStatus::Completed),
            "error" => Some(LogStatus::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub operation: String,
    pub status: LogStatus,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub created_at: i64,
}

/// Emitted on inserts/updates for passive observability.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    ArticleInserted { id: i64, source_name: String },
    ArticleStatusChanged { id: i64, status: ArticleStatus },
    LogAppended { operation: String, status: LogStatus },
}
