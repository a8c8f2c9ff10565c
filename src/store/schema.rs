pub const SCHEMA: &str = r#"
-- sources table
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    source_type TEXT NOT NULL DEFAULT 'rss',
    is_active INTEGER NOT NULL DEFAULT 1,
    last_fetched INTEGER,
    fetch_interval_minutes INTEGER NOT NULL DEFAULT 180
);

CREATE INDEX IF NOT EXISTS idx_sources_active ON sources(is_active);

-- articles table
-- source_url is the canonical dedup key; the UNIQUE constraint closes the
-- read-then-write race between overlapping fetch cycles.
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    original_content TEXT,
    summary TEXT,
    source_url TEXT NOT NULL UNIQUE,
    source_name TEXT NOT NULL,
    published_at INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    featured INTEGER NOT NULL DEFAULT 0,
    view_count INTEGER NOT NULL DEFAULT 0,
    tags TEXT NOT NULL DEFAULT '[]',
    influence_score REAL,
    education_relevance REAL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(status);
CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at DESC);

-- pipeline_logs table (append-only; purged by retention only)
CREATE TABLE IF NOT EXISTS pipeline_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL,
    status TEXT NOT NULL,
    message TEXT NOT NULL,
    details TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_logs_operation ON pipeline_logs(operation, status, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_logs_created_at ON pipeline_logs(created_at);
"#;
