// src/error.rs
//! Pipeline error taxonomy. Low-level errors are caught at the orchestrator
//! and converted into counters; only source-list reads and configuration
//! problems are allowed to fail a whole operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upstream returned a non-2xx status.
    #[error("fetch failed for {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    /// Network-level failure reaching a source (DNS, TLS, timeout).
    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Malformed feed content. Skips the source for this cycle only.
    #[error("failed to parse feed from {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("datastore error: {0}")]
    Persistence(#[from] tokio_rusqlite::Error),

    /// Missing or invalid configuration. Surfaces loudly at initialization.
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
