//! Retrieval over a session's documents.
//!
//! The primary path embeds the query and asks the session's vector index
//! for the nearest chunks. When the index is absent, or the embedder is
//! unreachable at query time, retrieval degrades to a case-insensitive
//! sentence scan of the raw document text. Fallback results carry no score
//! and their order is a stability guarantee (document order, then sentence
//! order), not a relevance ranking.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::models::ChunkMatch;
use crate::session::{Session, SessionStore};

/// Retrieval façade shared by chat and direct search callers.
pub struct Retrieval {
    sessions: Arc<SessionStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    default_k: usize,
}

impl Retrieval {
    pub fn new(
        sessions: Arc<SessionStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &crate::config::Config,
    ) -> Self {
        Self {
            sessions,
            embedder,
            default_k: config.retrieval.default_k,
        }
    }

    /// [`search`](Self::search) with the configured default result count.
    pub async fn search_top(&self, token: &str, query: &str) -> Result<Vec<ChunkMatch>> {
        self.search(token, query, self.default_k).await
    }

    /// Top-`k` chunks for `query` in the session behind `token`.
    ///
    /// A blank query or an empty corpus yields an empty result, never an
    /// error; `k` of zero is rejected.
    pub async fn search(&self, token: &str, query: &str, k: usize) -> Result<Vec<ChunkMatch>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be >= 1".to_string()));
        }
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let (slot, _) = self.sessions.get_or_create(Some(token)).await;
        let session = slot.lock().await;

        if let Some(index) = &session.index {
            match self.embedder.embed(query).await {
                Ok(query_vector) => return index.query(&query_vector, k),
                Err(e) => {
                    tracing::warn!(
                        session_id = %session.id,
                        error = %e,
                        "query embedding failed; using fallback search"
                    );
                }
            }
        } else {
            tracing::debug!(session_id = %session.id, "no index; using fallback search");
        }

        Ok(fallback_search(&session, query, k))
    }
}

/// Case-insensitive substring scan over the sentences of every document,
/// in document-then-sentence order, capped at `k` matches.
pub fn fallback_search(session: &Session, query: &str, k: usize) -> Vec<ChunkMatch> {
    let needle = query.to_lowercase();
    let mut matches = Vec::new();

    for doc in &session.documents {
        let sentences = doc
            .full_text
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty());
        for (i, sentence) in sentences.enumerate() {
            if sentence.to_lowercase().contains(&needle) {
                matches.push(ChunkMatch {
                    chunk_id: format!("{}_fallback_{}", doc.id, i),
                    document_id: doc.id.clone(),
                    chunk_index: i,
                    content: sentence.to_string(),
                    score: None,
                });
                if matches.len() >= k {
                    return matches;
                }
            }
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use chrono::Utc;

    fn session_with_docs(texts: &[&str]) -> Session {
        let mut session = Session::new();
        for (i, text) in texts.iter().enumerate() {
            session.documents.push(Document {
                id: format!("doc{}", i),
                session_id: session.id.clone(),
                name: format!("doc{}.pdf", i),
                full_text: text.to_string(),
                page_count: 1,
                byte_size: text.len(),
                uploaded_at: Utc::now(),
            });
        }
        session
    }

    #[test]
    fn test_fallback_matches_case_insensitive() {
        let session = session_with_docs(&["Alice has a red BALL. Bob likes trains."]);
        let matches = fallback_search(&session, "ball", 3);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].content, "Alice has a red BALL");
        assert_eq!(matches[0].score, None);
        assert_eq!(matches[0].chunk_id, "doc0_fallback_0");
    }

    #[test]
    fn test_fallback_caps_at_k() {
        let session = session_with_docs(&["A cat sat. A cat ran! A cat slept? A cat ate."]);
        let matches = fallback_search(&session, "cat", 2);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].content, "A cat sat");
        assert_eq!(matches[1].content, "A cat ran");
    }

    #[test]
    fn test_fallback_walks_documents_in_order() {
        let session = session_with_docs(&[
            "Nothing relevant here.",
            "The topic appears once. Unrelated tail.",
            "The topic shows up again.",
        ]);
        let matches = fallback_search(&session, "topic", 5);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].document_id, "doc1");
        assert_eq!(matches[1].document_id, "doc2");
    }

    #[test]
    fn test_fallback_empty_session_yields_nothing() {
        let session = session_with_docs(&[]);
        assert!(fallback_search(&session, "anything", 3).is_empty());
    }

    #[test]
    fn test_fallback_sentence_indices_skip_blanks() {
        // Consecutive terminators produce empty fragments that must not
        // consume an index.
        let session = session_with_docs(&["First!! Second. Third."]);
        let matches = fallback_search(&session, "third", 3);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].chunk_index, 2);
    }
}
