// src/config.rs
//! Runtime configuration: env-driven constants plus the default source list.
//! Source lists load from $NEWS_SOURCES_PATH, then config/sources.toml, then
//! config/sources.json, then the compiled-in defaults.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::store::types::NewSource;

const ENV_SOURCES_PATH: &str = "NEWS_SOURCES_PATH";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub db_path: String,
    pub bind_addr: String,
    pub user_agent: String,
    pub fetch_interval_hours: u64,
    pub summary_delay_minutes: u64,
    pub max_summary_batch: usize,
    pub log_retention_days: u64,
    pub failed_retention_days: u64,
    /// How far in the future a claimed publish date may sit before the
    /// article counts as corrupted.
    pub future_date_slop_days: u64,
    pub source_delay_ms: u64,
    pub fetch_timeout_secs: u64,
    pub title_max_len: usize,
    pub summary_endpoint: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            db_path: "news.db".to_string(),
            bind_addr: "0.0.0.0:8000".to_string(),
            user_agent: "ai-news-pipeline/0.1 (+https://github.com/ai-literacy/news-pipeline)"
                .to_string(),
            fetch_interval_hours: 3,
            summary_delay_minutes: 10,
            max_summary_batch: 10,
            log_retention_days: 30,
            failed_retention_days: 7,
            future_date_slop_days: 2,
            source_delay_ms: 2000,
            fetch_timeout_secs: 10,
            title_max_len: 255,
            summary_endpoint: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            db_path: env_str("NEWS_DB_PATH", &d.db_path),
            bind_addr: env_str("NEWS_BIND_ADDR", &d.bind_addr),
            user_agent: env_str("NEWS_USER_AGENT", &d.user_agent),
            fetch_interval_hours: env_u64("NEWS_FETCH_INTERVAL_HOURS", d.fetch_interval_hours),
            summary_delay_minutes: env_u64("NEWS_SUMMARY_DELAY_MINUTES", d.summary_delay_minutes),
            max_summary_batch: env_u64("NEWS_MAX_SUMMARY_BATCH", d.max_summary_batch as u64)
                as usize,
            log_retention_days: env_u64("NEWS_LOG_RETENTION_DAYS", d.log_retention_days),
            failed_retention_days: env_u64("NEWS_FAILED_RETENTION_DAYS", d.failed_retention_days),
            future_date_slop_days: env_u64("NEWS_FUTURE_DATE_SLOP_DAYS", d.future_date_slop_days),
            source_delay_ms: env_u64("NEWS_SOURCE_DELAY_MS", d.source_delay_ms),
            fetch_timeout_secs: env_u64("NEWS_FETCH_TIMEOUT_SECS", d.fetch_timeout_secs),
            title_max_len: d.title_max_len,
            summary_endpoint: std::env::var("NEWS_SUMMARY_ENDPOINT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn fetch_interval_secs(&self) -> u64 {
        self.fetch_interval_hours * 3600
    }

    pub fn future_date_slop_secs(&self) -> i64 {
        (self.future_date_slop_days * 86_400) as i64
    }
}

fn env_str(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

/// Compiled-in fallback when no sources file is configured.
pub const DEFAULT_SOURCES: &[(&str, &str)] = &[
    ("MIT Technology Review AI", "https://www.technologyreview.com/feed/"),
    ("Google AI Blog", "https://blog.google/technology/ai/rss/"),
    ("OpenAI News", "https://openai.com/news/rss.xml"),
    ("Berkeley AI Research", "https://bair.berkeley.edu/blog/feed.xml"),
    ("VentureBeat AI", "https://venturebeat.com/category/ai/feed/"),
    ("The Verge", "https://www.theverge.com/rss/index.xml"),
];

/// Load the desired source set from an explicit path. TOML or JSON.
pub fn load_sources_from(path: &Path) -> Result<Vec<NewSource>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load sources using env var + fallbacks:
/// 1) $NEWS_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) compiled-in DEFAULT_SOURCES
pub fn load_sources_default() -> Result<Vec<NewSource>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("NEWS_SOURCES_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(DEFAULT_SOURCES
        .iter()
        .map(|(name, url)| NewSource {
            name: name.to_string(),
            url: url.to_string(),
        })
        .collect())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<NewSource>> {
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<NewSource>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<NewSource>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<NewSource>> {
    let v: Vec<NewSource> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

fn clean_list(items: Vec<NewSource>) -> Vec<NewSource> {
    use std::collections::BTreeSet;
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let url = it.url.trim().to_string();
        let name = it.name.trim().to_string();
        if url.is_empty() || name.is_empty() {
            continue;
        }
        if seen.insert(url.clone()) {
            out.push(NewSource { name, url });
        }
    }
    out
}
