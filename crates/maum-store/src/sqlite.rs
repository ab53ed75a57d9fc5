//! SQLite-backed store: connection discipline, messages, analysis rows,
//! session markers.
//!
//! All writes go through one connection guarded by a mutex; the analysis
//! row and its session marker are committed in a single short transaction
//! so neither can exist without the other.

use std::path::{Path, PathBuf};

use ndarray::Array1;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::embedding::quantize_uint8;
use crate::kb::KbMatrix;
use crate::schema::{CACHE_SCHEMA_SQL, KB_SCHEMA_SQL, SCHEMA_SQL};
use crate::types::*;
use maum_core::{AnalysisResult, Error, Result};

/// SQLite store for the emotion pipeline.
pub struct EmotionStore {
    pub(crate) conn: Mutex<Connection>,
    pub(crate) db_path: PathBuf,
    pub(crate) embedding_dim: usize,
    pub(crate) kb_matrix: Mutex<KbMatrix>,
}

pub(crate) fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

impl EmotionStore {
    /// Open or create the store. The file will be `db_dir/maum.db`.
    ///
    /// On open the KB is checked against the current taxonomy and wiped if
    /// stale (see `kb_auto_heal`); the caller is expected to rebuild from
    /// seed when `kb_needs_rebuild` reports true.
    pub fn open(db_dir: impl AsRef<Path>, embedding_dim: usize) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("maum.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            embedding_dim,
            kb_matrix: Mutex::new(KbMatrix::empty(embedding_dim)),
        };

        let wiped = store.kb_auto_heal()?;
        store.load_kb_matrix()?;

        info!(
            "EmotionStore initialized: {} analysis rows, {} kb entries{}, dim={}, path={}",
            store.count_analyses()?,
            store.kb_count()?,
            if wiped { " (kb wiped: stale taxonomy)" } else { "" },
            embedding_dim,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        let full_schema = format!("{}\n{}\n{}", SCHEMA_SQL, KB_SCHEMA_SQL, CACHE_SCHEMA_SQL);
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Conversation messages
    // ---------------------------------------------------------------

    /// Insert a conversation message. Returns the new row ID.
    pub fn add_message(
        &self,
        user_id: i64,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO conversations (user_id, session_id, role, content, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![user_id, session_id, role, content, now_secs()])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(id)
    }

    /// Messages of one session with the given role, in insertion order.
    pub fn get_session_messages(
        &self,
        user_id: i64,
        session_id: &str,
        role: &str,
    ) -> Result<Vec<ConversationMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, user_id, session_id, role, content, created_at \
                 FROM conversations \
                 WHERE user_id = ?1 AND session_id = ?2 AND role = ?3 \
                 ORDER BY id",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![user_id, session_id, role], |row| {
                Ok(ConversationMessage {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    session_id: row.get(2)?,
                    role: row.get(3)?,
                    content: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Distinct sessions that have no analyzed-session marker, oldest first.
    pub fn list_unanalyzed_sessions(&self, limit: usize) -> Result<Vec<SessionRef>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT c.session_id, c.user_id \
                 FROM conversations c \
                 LEFT JOIN analyzed_sessions a ON a.session_id = c.session_id \
                 WHERE a.id IS NULL \
                 GROUP BY c.session_id, c.user_id \
                 ORDER BY MIN(c.id) \
                 LIMIT ?1",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(SessionRef {
                    session_id: row.get(0)?,
                    user_id: row.get(1)?,
                })
            })
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ---------------------------------------------------------------
    // Analyzed-session markers
    // ---------------------------------------------------------------

    /// Whether a marker exists for the session.
    pub fn is_session_analyzed(&self, session_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .prepare_cached("SELECT id FROM analyzed_sessions WHERE session_id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![session_id], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(found.is_some())
    }

    /// Insert a marker without an analysis row (gated-skip / empty session).
    /// Idempotent on `session_id`.
    pub fn insert_marker(&self, session_id: &str, user_id: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT OR IGNORE INTO analyzed_sessions (session_id, user_id, created_at) \
             VALUES (?1, ?2, ?3)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![session_id, user_id, now_secs()])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Analysis rows
    // ---------------------------------------------------------------

    fn insert_analysis_row(
        conn: &Connection,
        user_id: i64,
        source: &str,
        input_text: &str,
        result: &AnalysisResult,
        embedding: Option<&Array1<f32>>,
    ) -> Result<i64> {
        let result_json = serde_json::to_string(result)?;
        let quantized = embedding.map(quantize_uint8);
        let (blob, scale, offset) = match &quantized {
            Some((b, s, o)) => (Some(b.as_slice()), Some(*s), Some(*o)),
            None => (None, None, None),
        };
        let id = conn
            .prepare_cached(
                "INSERT INTO emotion_analysis \
                 (user_id, source, input_text, result_json, embedding, scale, offset_val, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![user_id, source, input_text, result_json, blob, scale, offset, now_secs()])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(id)
    }

    /// Append an analysis row outside any session context. Returns the
    /// analysis ID.
    pub fn save_analysis(
        &self,
        user_id: i64,
        source: &str,
        input_text: &str,
        result: &AnalysisResult,
        embedding: Option<&Array1<f32>>,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        Self::insert_analysis_row(&conn, user_id, source, input_text, result, embedding)
    }

    /// Append an analysis row and the session marker in one transaction.
    /// On failure both are rolled back and the session stays eligible for
    /// retry.
    pub fn save_analysis_with_marker(
        &self,
        user_id: i64,
        session_id: &str,
        source: &str,
        input_text: &str,
        result: &AnalysisResult,
        embedding: Option<&Array1<f32>>,
    ) -> Result<i64> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;

        let analysis_id =
            Self::insert_analysis_row(&tx, user_id, source, input_text, result, embedding)?;
        tx.execute(
            "INSERT INTO analyzed_sessions (session_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![session_id, user_id, now_secs()],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        Ok(analysis_id)
    }

    /// Fetch one analysis row by ID.
    pub fn get_analysis(&self, analysis_id: i64) -> Result<Option<AnalysisRow>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached(
                "SELECT id, user_id, source, input_text, result_json, embedding, created_at \
                 FROM emotion_analysis WHERE id = ?1",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![analysis_id], |row| {
                let result_json: String = row.get(4)?;
                let blob: Option<Vec<u8>> = row.get(5)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    result_json,
                    blob.is_some(),
                    row.get::<_, i64>(6)?,
                ))
            })
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        match row {
            None => Ok(None),
            Some((id, user_id, source, input_text, result_json, has_embedding, created_at)) => {
                let result: AnalysisResult = serde_json::from_str(&result_json)?;
                Ok(Some(AnalysisRow {
                    id,
                    user_id,
                    source,
                    input_text,
                    result,
                    has_embedding,
                    created_at,
                }))
            }
        }
    }

    /// Total number of analysis rows.
    pub fn count_analyses(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM emotion_analysis", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Total number of session markers.
    pub fn count_markers(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM analyzed_sessions", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use maum_core::taxonomy::EmotionGroup;
    use maum_core::{PrimaryEmotion, RiskLevel, Sentiment, ServiceSignals};
    use tempfile::TempDir;

    pub(crate) fn test_store() -> (EmotionStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = EmotionStore::open(dir.path(), 8).unwrap();
        (store, dir)
    }

    pub(crate) fn sample_result(text: &str) -> AnalysisResult {
        AnalysisResult {
            text: text.into(),
            language: "ko".into(),
            raw_distribution: vec![],
            primary_emotion: PrimaryEmotion {
                code: "sadness".into(),
                name_ko: "슬픔".into(),
                group: EmotionGroup::Negative,
                intensity: 3,
                confidence: 0.8,
            },
            secondary_emotions: vec![],
            sentiment_overall: Sentiment::Negative,
            service_signals: ServiceSignals {
                need_empathy: true,
                need_routine_recommend: true,
                need_health_check: false,
                need_voice_analysis: false,
                risk_level: RiskLevel::Watch,
            },
            recommended_response_style: vec![],
            recommended_routine_tags: vec![],
            report_tags: vec![],
            analysis_id: None,
            message_count: None,
            cached: None,
            cache_similarity: None,
        }
    }

    #[test]
    fn messages_return_in_insertion_order() {
        let (store, _dir) = test_store();
        store.add_message(1, "s1", "user", "첫번째").unwrap();
        store.add_message(1, "s1", "assistant", "네").unwrap();
        store.add_message(1, "s1", "user", "두번째").unwrap();

        let msgs = store.get_session_messages(1, "s1", "user").unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].content, "첫번째");
        assert_eq!(msgs[1].content, "두번째");
    }

    #[test]
    fn unanalyzed_sessions_exclude_marked() {
        let (store, _dir) = test_store();
        store.add_message(1, "s1", "user", "안녕하세요 오늘 기분이 좋아요").unwrap();
        store.add_message(2, "s2", "user", "오늘 너무 힘들어요").unwrap();

        let pending = store.list_unanalyzed_sessions(10).unwrap();
        assert_eq!(pending.len(), 2);

        store.insert_marker("s1", 1).unwrap();
        let pending = store.list_unanalyzed_sessions(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].session_id, "s2");
    }

    #[test]
    fn marker_insert_is_idempotent() {
        let (store, _dir) = test_store();
        store.insert_marker("s1", 1).unwrap();
        store.insert_marker("s1", 1).unwrap();
        assert_eq!(store.count_markers().unwrap(), 1);
        assert!(store.is_session_analyzed("s1").unwrap());
    }

    #[test]
    fn row_and_marker_commit_together() {
        let (store, _dir) = test_store();
        let result = sample_result("오늘 슬퍼요");
        let id = store
            .save_analysis_with_marker(1, "s1", "conversation", "오늘 슬퍼요", &result, None)
            .unwrap();
        assert!(id > 0);
        assert!(store.is_session_analyzed("s1").unwrap());
        assert_eq!(store.count_analyses().unwrap(), 1);

        // Duplicate marker must fail the whole transaction: no second row.
        let err = store.save_analysis_with_marker(1, "s1", "conversation", "오늘 슬퍼요", &result, None);
        assert!(err.is_err());
        assert_eq!(store.count_analyses().unwrap(), 1);
        assert_eq!(store.count_markers().unwrap(), 1);
    }

    #[test]
    fn analysis_row_roundtrip_with_embedding() {
        let (store, _dir) = test_store();
        let result = sample_result("피곤해요");
        let embedding = ndarray::Array1::from_vec(vec![0.1, -0.2, 0.3, 0.0, 0.5, -0.5, 0.2, 0.1]);
        let id = store
            .save_analysis(7, "daily_mood", "피곤해요", &result, Some(&embedding))
            .unwrap();

        let row = store.get_analysis(id).unwrap().unwrap();
        assert_eq!(row.user_id, 7);
        assert_eq!(row.source, "daily_mood");
        assert!(row.has_embedding);
        assert_eq!(row.result.primary_emotion.code, "sadness");
    }
}
