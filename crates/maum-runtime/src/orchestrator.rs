//! Session batch orchestrator.
//!
//! Drives one session through the marker check, gate, cache lookup and
//! full analysis. The analysis row and the session marker commit in one
//! transaction, so a session can never end up half-processed: either both
//! exist or the session stays eligible for retry.

use std::sync::Arc;

use tracing::{error, info, warn};

use maum_analyzer::{gate, EmotionAnalyzer, GateDecision};
use maum_core::{AnalysisResult, Error, Result};
use maum_infer::EmbedderBackend;
use maum_llm::CompletionBackend;
use maum_store::EmotionStore;

/// Counters for one `batch_run` pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub scanned: usize,
    pub analyzed: usize,
    pub cache_hits: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Orchestrates gate, cache, analyzer and persistence per session.
pub struct Orchestrator<C> {
    store: Arc<EmotionStore>,
    embedder: Arc<dyn EmbedderBackend>,
    analyzer: EmotionAnalyzer<C>,
    cache_threshold: f64,
    cache_freshness_days: i64,
}

impl<C: CompletionBackend> Orchestrator<C> {
    pub fn new(
        store: Arc<EmotionStore>,
        embedder: Arc<dyn EmbedderBackend>,
        llm: C,
        cache_threshold: f64,
        cache_freshness_days: i64,
    ) -> Self {
        let analyzer = EmotionAnalyzer::new(store.clone(), embedder.clone(), llm);
        Self {
            store,
            embedder,
            analyzer,
            cache_threshold,
            cache_freshness_days,
        }
    }

    /// Single-text entry point. No session, marker or persistence involved.
    pub async fn analyze_text(&self, text: &str) -> Result<AnalysisResult> {
        self.analyzer.analyze(text).await
    }

    /// Analyze one session. Returns None for already-processed, empty and
    /// gate-skipped sessions; all three leave a marker behind.
    pub async fn analyze_session(
        &self,
        user_id: i64,
        session_id: &str,
    ) -> Result<Option<AnalysisResult>> {
        if self.store.is_session_analyzed(session_id)? {
            return Ok(None);
        }

        let messages = self.store.get_session_messages(user_id, session_id, "user")?;
        if messages.is_empty() {
            self.store.insert_marker(session_id, user_id)?;
            return Ok(None);
        }
        let message_count = messages.len();
        let combined: String = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(". ");

        match gate(&combined) {
            GateDecision::Skip => {
                info!("session {} gated as noise, marking without analysis", session_id);
                self.store.insert_marker(session_id, user_id)?;
                return Ok(None);
            }
            GateDecision::Emergency => {
                warn!("PRIORITY: emergency keywords in session {}, forcing analysis", session_id);
            }
            GateDecision::Proceed => {}
        }

        // One embedding serves the cache lookup, the KB retrieval and the
        // persisted row.
        let embedding = self
            .embedder
            .embed(&combined)
            .map(|r| r.embedding)
            .ok_or_else(|| Error::Embedding(format!("failed to embed session {}", session_id)))?;

        // A broken cache must not block the session; a lookup error is a miss.
        let cache_hit = match self.store.cache_search(
            &embedding,
            user_id,
            self.cache_threshold,
            self.cache_freshness_days,
        ) {
            Ok(hit) => hit,
            Err(e) => {
                warn!("cache lookup failed for session {}: {}", session_id, e);
                None
            }
        };

        if let Some(hit) = cache_hit {
            let mut result = hit.result;
            result.text = combined.clone();
            result.message_count = Some(message_count);
            result.cached = Some(true);
            result.cache_similarity = Some(hit.similarity);
            result.analysis_id = None;

            // Row carries the reused result; the embedding is omitted since
            // the cache already holds the original's.
            let analysis_id = self.store.save_analysis_with_marker(
                user_id,
                session_id,
                "conversation",
                &combined,
                &result,
                None,
            )?;
            result.analysis_id = Some(analysis_id);
            return Ok(Some(result));
        }

        let mut result = self
            .analyzer
            .analyze_with_embedding(&combined, Some(&embedding))
            .await?;
        result.message_count = Some(message_count);
        result.cached = Some(false);

        let analysis_id = self.store.save_analysis_with_marker(
            user_id,
            session_id,
            "conversation",
            &combined,
            &result,
            Some(&embedding),
        )?;
        result.analysis_id = Some(analysis_id);

        // Advisory write after the commit; a failure costs a future cache
        // hit, nothing else.
        if let Err(e) = self
            .store
            .cache_save(user_id, analysis_id, &combined, &result, &embedding)
        {
            warn!("cache save failed for analysis {}: {}", analysis_id, e);
        }

        info!(
            "session {} analyzed: primary={}, risk={:?}",
            session_id, result.primary_emotion.code, result.service_signals.risk_level
        );
        Ok(Some(result))
    }

    /// Process up to `limit` unanalyzed sessions sequentially. A failing
    /// session is logged and left unmarked for the next cycle.
    pub async fn batch_run(&self, limit: usize) -> Result<BatchReport> {
        let sessions = self.store.list_unanalyzed_sessions(limit)?;
        let mut report = BatchReport {
            scanned: sessions.len(),
            ..Default::default()
        };

        for session in sessions {
            match self.analyze_session(session.user_id, &session.session_id).await {
                Ok(Some(result)) => {
                    if result.cached == Some(true) {
                        report.cache_hits += 1;
                    } else {
                        report.analyzed += 1;
                    }
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    if e.is_transient() {
                        warn!(
                            "session {} failed, will retry next cycle: {}",
                            session.session_id, e
                        );
                    } else {
                        error!("session {} failed: {}", session.session_id, e);
                    }
                    report.failed += 1;
                }
            }
        }

        info!(
            "batch done: scanned={} analyzed={} cache_hits={} skipped={} failed={}",
            report.scanned, report.analyzed, report.cache_hits, report.skipped, report.failed
        );
        Ok(report)
    }
}
