//! Per-user similarity cache over past analysis results.
//!
//! Lookups are scoped to one user and a freshness window; within that set
//! the best cosine match above the threshold wins. A miss is always safe:
//! the caller falls through to a fresh analysis.

use ndarray::Array1;
use rusqlite::params;
use tracing::{debug, info};

use crate::embedding::{cosine_similarity, dequantize_uint8, quantize_uint8};
use crate::sqlite::{now_secs, EmotionStore};
use crate::types::CacheHit;
use maum_core::{AnalysisResult, Error, Result};

const SECONDS_PER_DAY: i64 = 86_400;

impl EmotionStore {
    /// Find the most similar fresh cache entry for the user, if any clears
    /// the threshold. Rows that fail to decode are skipped, not fatal.
    pub fn cache_search(
        &self,
        embedding: &Array1<f32>,
        user_id: i64,
        threshold: f64,
        freshness_days: i64,
    ) -> Result<Option<CacheHit>> {
        let cutoff = now_secs() - freshness_days * SECONDS_PER_DAY;

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT analysis_id, input_text, result_json, embedding, scale, offset_val, created_timestamp \
                 FROM cache_entries \
                 WHERE user_id = ?1 AND created_timestamp >= ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![user_id, cutoff], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                    row.get::<_, f32>(4)?,
                    row.get::<_, f32>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect::<Vec<_>>();
        drop(stmt);
        drop(conn);

        let mut best: Option<CacheHit> = None;
        let now = now_secs();
        for (analysis_id, input_text, result_json, blob, scale, offset, created) in rows {
            if blob.len() != embedding.len() {
                continue;
            }
            let stored = dequantize_uint8(&blob, scale, offset);
            let similarity = cosine_similarity(embedding, &stored) as f64;
            if similarity < threshold {
                continue;
            }
            if best.as_ref().map(|b| similarity <= b.similarity).unwrap_or(false) {
                continue;
            }
            let result: AnalysisResult = match serde_json::from_str(&result_json) {
                Ok(r) => r,
                Err(e) => {
                    debug!("skipping undecodable cache entry for analysis {}: {}", analysis_id, e);
                    continue;
                }
            };
            best = Some(CacheHit {
                result,
                similarity,
                age_days: (now - created).max(0) / SECONDS_PER_DAY,
                original_text: input_text,
                analysis_id,
            });
        }

        if let Some(hit) = &best {
            info!(
                "cache hit for user {}: analysis {} at similarity {:.3} ({}d old)",
                user_id, hit.analysis_id, hit.similarity, hit.age_days
            );
        }
        Ok(best)
    }

    /// Store an analysis result in the cache, keyed by user and analysis ID.
    /// Re-saving the same analysis overwrites the previous entry.
    pub fn cache_save(
        &self,
        user_id: i64,
        analysis_id: i64,
        input_text: &str,
        result: &AnalysisResult,
        embedding: &Array1<f32>,
    ) -> Result<()> {
        let cache_id = format!("user_{}_analysis_{}", user_id, analysis_id);
        let result_json = serde_json::to_string(result)?;
        let (blob, scale, offset) = quantize_uint8(embedding);

        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT OR REPLACE INTO cache_entries \
             (cache_id, user_id, analysis_id, input_text, result_json, embedding, scale, offset_val, created_timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![
            cache_id,
            user_id,
            analysis_id,
            input_text,
            result_json,
            blob,
            scale,
            offset,
            now_secs()
        ])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete entries older than the freshness window. Returns the number
    /// of rows removed.
    pub fn cache_evict_stale(&self, freshness_days: i64) -> Result<usize> {
        let cutoff = now_secs() - freshness_days * SECONDS_PER_DAY;
        let conn = self.conn.lock();
        let removed = conn
            .execute(
                "DELETE FROM cache_entries WHERE created_timestamp < ?1",
                params![cutoff],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        if removed > 0 {
            info!("evicted {} stale cache entries", removed);
        }
        Ok(removed)
    }

    /// Number of cache entries.
    pub fn cache_count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::tests::{sample_result, test_store};
    use ndarray::Array1;

    fn vec8(values: [f32; 8]) -> Array1<f32> {
        Array1::from_vec(values.to_vec())
    }

    #[test]
    fn search_returns_best_match_above_threshold() {
        let (store, _dir) = test_store();
        let near = vec8([1.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let far = vec8([0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        store
            .cache_save(1, 10, "오늘 우울해요", &sample_result("오늘 우울해요"), &near)
            .unwrap();
        store
            .cache_save(1, 11, "점심 뭐 먹지", &sample_result("점심 뭐 먹지"), &far)
            .unwrap();

        let query = vec8([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let hit = store.cache_search(&query, 1, 0.85, 30).unwrap().unwrap();
        assert_eq!(hit.analysis_id, 10);
        assert!(hit.similarity > 0.99);
        assert_eq!(hit.original_text, "오늘 우울해요");
    }

    #[test]
    fn search_is_scoped_to_user() {
        let (store, _dir) = test_store();
        let v = vec8([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        store
            .cache_save(1, 10, "슬퍼요", &sample_result("슬퍼요"), &v)
            .unwrap();

        assert!(store.cache_search(&v, 2, 0.85, 30).unwrap().is_none());
        assert!(store.cache_search(&v, 1, 0.85, 30).unwrap().is_some());
    }

    #[test]
    fn below_threshold_is_a_miss() {
        let (store, _dir) = test_store();
        let stored = vec8([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        store
            .cache_save(1, 10, "슬퍼요", &sample_result("슬퍼요"), &stored)
            .unwrap();

        let query = vec8([0.3, 0.95, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(store.cache_search(&query, 1, 0.85, 30).unwrap().is_none());
    }

    #[test]
    fn stale_entries_are_ignored_and_evictable() {
        let (store, _dir) = test_store();
        let v = vec8([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        store
            .cache_save(1, 10, "슬퍼요", &sample_result("슬퍼요"), &v)
            .unwrap();

        // Age the entry past the window.
        {
            let conn = store.conn.lock();
            conn.execute(
                "UPDATE cache_entries SET created_timestamp = created_timestamp - 40 * 86400",
                [],
            )
            .unwrap();
        }

        assert!(store.cache_search(&v, 1, 0.85, 30).unwrap().is_none());
        assert_eq!(store.cache_evict_stale(30).unwrap(), 1);
        assert_eq!(store.cache_count().unwrap(), 0);
    }

    #[test]
    fn resave_overwrites_same_analysis() {
        let (store, _dir) = test_store();
        let v = vec8([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        store
            .cache_save(1, 10, "첫번째", &sample_result("첫번째"), &v)
            .unwrap();
        store
            .cache_save(1, 10, "두번째", &sample_result("두번째"), &v)
            .unwrap();
        assert_eq!(store.cache_count().unwrap(), 1);
    }
}
