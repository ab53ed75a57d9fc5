//! Database schema SQL.

/// Conversation messages, analysis rows and session markers.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    session_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_session ON conversations(session_id);
CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id);

CREATE TABLE IF NOT EXISTS emotion_analysis (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    source TEXT NOT NULL DEFAULT 'conversation',
    input_text TEXT NOT NULL,
    result_json TEXT NOT NULL,
    embedding BLOB,
    scale REAL,
    offset_val REAL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_analysis_user ON emotion_analysis(user_id);

CREATE TABLE IF NOT EXISTS analyzed_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL UNIQUE,
    user_id INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);
"#;

/// Emotion-context KB collection plus its metadata table.
pub const KB_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kb_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    emotion_code TEXT NOT NULL,
    intensity INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    scale REAL NOT NULL,
    offset_val REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS kb_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Per-user similarity cache for analysis reuse.
pub const CACHE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL,
    analysis_id INTEGER NOT NULL,
    input_text TEXT NOT NULL,
    result_json TEXT NOT NULL,
    embedding BLOB NOT NULL,
    scale REAL NOT NULL,
    offset_val REAL NOT NULL,
    created_timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cache_user_time ON cache_entries(user_id, created_timestamp);
"#;
