//! Emotion-context KB: seeded exemplar utterances with embeddings.
//!
//! All entries are mirrored into an in-memory row-normalized matrix so a
//! search is one matrix-vector product. The matrix is rebuilt lazily after
//! any write (`dirty` flag).

use ndarray::{Array1, Array2};
use rusqlite::params;
use tracing::{info, warn};

use crate::embedding::{dequantize_uint8, quantize_uint8};
use crate::sqlite::{now_secs, EmotionStore};
use crate::types::{KbHit, SeedEntry};
use maum_core::taxonomy::{is_known, TAXONOMY_VERSION};
use maum_core::{Error, Result};

/// In-memory mirror of the KB embeddings, rows L2-normalized.
pub(crate) struct KbMatrix {
    pub(crate) matrix: Array2<f32>,
    pub(crate) ids: Vec<i64>,
    pub(crate) dirty: bool,
}

impl KbMatrix {
    pub(crate) fn empty(dim: usize) -> Self {
        Self {
            matrix: Array2::zeros((0, dim)),
            ids: Vec::new(),
            dirty: true,
        }
    }
}

fn normalize_into(mut v: Array1<f32>) -> Array1<f32> {
    let norm = v.dot(&v).sqrt();
    if norm > 1e-9 {
        v.mapv_inplace(|x| x / norm);
    }
    v
}

impl EmotionStore {
    /// Wipe the KB when its recorded taxonomy version does not match the
    /// current one, or when any stored emotion code is no longer known.
    /// Returns true if the KB was wiped.
    pub(crate) fn kb_auto_heal(&self) -> Result<bool> {
        let conn = self.conn.lock();

        let stored_version: Option<String> = conn
            .query_row(
                "SELECT value FROM kb_meta WHERE key = 'taxonomy_version'",
                [],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(Error::Database(other.to_string())),
            })?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM kb_entries", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;

        let version_ok = stored_version
            .as_deref()
            .and_then(|v| v.parse::<u32>().ok())
            .map(|v| v == TAXONOMY_VERSION)
            .unwrap_or(false);

        let codes_ok = if count == 0 {
            true
        } else {
            let mut stmt = conn
                .prepare("SELECT DISTINCT emotion_code FROM kb_entries")
                .map_err(|e| Error::Database(e.to_string()))?;
            let codes = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| Error::Database(e.to_string()))?
                .filter_map(|r| r.ok())
                .collect::<Vec<_>>();
            codes.iter().all(|c| is_known(c))
        };

        if count > 0 && (!version_ok || !codes_ok) {
            warn!(
                "KB taxonomy mismatch (stored={:?}, current={}), wiping {} entries",
                stored_version, TAXONOMY_VERSION, count
            );
            conn.execute("DELETE FROM kb_entries", [])
                .map_err(|e| Error::Database(e.to_string()))?;
            conn.execute("DELETE FROM kb_meta WHERE key = 'taxonomy_version'", [])
                .map_err(|e| Error::Database(e.to_string()))?;
            // Lock order is matrix before connection everywhere.
            drop(conn);
            self.kb_matrix.lock().dirty = true;
            return Ok(true);
        }

        Ok(false)
    }

    /// Whether the KB must be reseeded before it can serve context.
    pub fn kb_needs_rebuild(&self) -> Result<bool> {
        Ok(self.kb_count()? == 0)
    }

    /// Replace all KB entries with the given seeded entries and their
    /// embeddings. Every entry is validated up front; one bad entry fails
    /// the whole rebuild before any write.
    pub fn kb_rebuild(&self, entries: &[(SeedEntry, Array1<f32>)]) -> Result<usize> {
        for (seed, embedding) in entries {
            if seed.text.trim().is_empty() {
                return Err(Error::Storage("KB seed entry has empty text".into()));
            }
            if !is_known(&seed.emotion) {
                return Err(Error::Storage(format!(
                    "KB seed entry has unknown emotion code: {}",
                    seed.emotion
                )));
            }
            if !(1..=5).contains(&seed.intensity) {
                return Err(Error::Storage(format!(
                    "KB seed entry intensity out of range: {} ({})",
                    seed.intensity, seed.emotion
                )));
            }
            if embedding.len() != self.embedding_dim {
                return Err(Error::Storage(format!(
                    "KB seed embedding dim {} != store dim {}",
                    embedding.len(),
                    self.embedding_dim
                )));
            }
        }

        {
            let mut conn = self.conn.lock();
            let tx = conn
                .transaction()
                .map_err(|e| Error::Database(e.to_string()))?;

            tx.execute("DELETE FROM kb_entries", [])
                .map_err(|e| Error::Database(e.to_string()))?;
            for (seed, embedding) in entries {
                let (blob, scale, offset) = quantize_uint8(embedding);
                tx.execute(
                    "INSERT INTO kb_entries (text, emotion_code, intensity, embedding, scale, offset_val) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![seed.text, seed.emotion, seed.intensity, blob, scale, offset],
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            }
            tx.execute(
                "INSERT OR REPLACE INTO kb_meta (key, value) VALUES ('taxonomy_version', ?1)",
                params![TAXONOMY_VERSION.to_string()],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
            tx.execute(
                "INSERT OR REPLACE INTO kb_meta (key, value) VALUES ('rebuilt_at', ?1)",
                params![now_secs().to_string()],
            )
            .map_err(|e| Error::Database(e.to_string()))?;

            tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        }

        self.kb_matrix.lock().dirty = true;
        self.load_kb_matrix()?;
        info!("KB rebuilt with {} entries (taxonomy v{})", entries.len(), TAXONOMY_VERSION);
        Ok(entries.len())
    }

    /// Rebuild the in-memory matrix from the table if marked dirty.
    pub(crate) fn load_kb_matrix(&self) -> Result<()> {
        let mut kb = self.kb_matrix.lock();
        if !kb.dirty {
            return Ok(());
        }

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, embedding, scale, offset_val FROM kb_entries ORDER BY id")
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, f32>(2)?,
                    row.get::<_, f32>(3)?,
                ))
            })
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect::<Vec<_>>();

        let mut matrix = Array2::zeros((rows.len(), self.embedding_dim));
        let mut ids = Vec::with_capacity(rows.len());
        for (i, (id, blob, scale, offset)) in rows.into_iter().enumerate() {
            if blob.len() != self.embedding_dim {
                return Err(Error::Storage(format!(
                    "KB entry {} embedding dim {} != store dim {}",
                    id,
                    blob.len(),
                    self.embedding_dim
                )));
            }
            let v = normalize_into(dequantize_uint8(&blob, scale, offset));
            matrix.row_mut(i).assign(&v);
            ids.push(id);
        }

        kb.matrix = matrix;
        kb.ids = ids;
        kb.dirty = false;
        Ok(())
    }

    /// Top-k nearest KB entries for the query embedding, ascending by
    /// distance (1 − cosine similarity). Empty KB yields an empty list.
    pub fn kb_search(&self, embedding: &Array1<f32>, k: usize) -> Result<Vec<KbHit>> {
        if embedding.len() != self.embedding_dim {
            return Err(Error::Storage(format!(
                "query embedding dim {} != store dim {}",
                embedding.len(),
                self.embedding_dim
            )));
        }
        self.load_kb_matrix()?;

        let (top_ids, top_distances) = {
            let kb = self.kb_matrix.lock();
            if kb.ids.is_empty() || k == 0 {
                return Ok(Vec::new());
            }
            let query = normalize_into(embedding.clone());
            let sims = kb.matrix.dot(&query);

            let mut scored: Vec<(usize, f32)> =
                sims.iter().copied().enumerate().collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(k);

            let ids: Vec<i64> = scored.iter().map(|&(i, _)| kb.ids[i]).collect();
            let distances: Vec<f64> = scored.iter().map(|&(_, s)| (1.0 - s) as f64).collect();
            (ids, distances)
        };

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT text, emotion_code, intensity FROM kb_entries WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?;
        let mut hits = Vec::with_capacity(top_ids.len());
        for (id, distance) in top_ids.into_iter().zip(top_distances) {
            let (text, emotion_code, intensity) = stmt
                .query_row(params![id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(|e| Error::Database(e.to_string()))?;
            hits.push(KbHit {
                text,
                emotion_code,
                intensity,
                distance,
            });
        }
        Ok(hits)
    }

    /// Number of KB entries.
    pub fn kb_count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM kb_entries", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }
}
