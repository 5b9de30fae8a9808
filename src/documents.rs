//! Document lifecycle and index rebuild.
//!
//! Every mutation of a session's document set (add, delete, clear) runs
//! under that session's lock and ends with the index either rebuilt over
//! the full remaining set or absent. There is no incremental update path,
//! so the index can never describe documents the session no longer holds.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::chunk::chunk_document;
use crate::config::{ChunkingConfig, Config, UploadConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::extract::TextExtractor;
use crate::index::VectorIndex;
use crate::models::{Chunk, Document};
use crate::session::{Session, SessionStore};

/// Owns per-session document lifecycle.
pub struct DocumentManager {
    sessions: Arc<SessionStore>,
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunking: ChunkingConfig,
    upload: UploadConfig,
}

impl DocumentManager {
    pub fn new(
        sessions: Arc<SessionStore>,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &Config,
    ) -> Self {
        Self {
            sessions,
            extractor,
            embedder,
            chunking: config.chunking.clone(),
            upload: config.upload.clone(),
        }
    }

    /// Validate and extract an uploaded file, then add it as a document.
    ///
    /// Oversized payloads are rejected before extraction; extractor failures
    /// reject the upload. Nothing is stored on any failure path.
    pub async fn upload(
        &self,
        token: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<Document> {
        if bytes.len() > self.upload.max_bytes {
            tracing::warn!(
                name = filename,
                bytes = bytes.len(),
                limit = self.upload.max_bytes,
                "rejected oversized upload"
            );
            return Err(Error::InvalidArgument(format!(
                "file too large: {} bytes (limit {})",
                bytes.len(),
                self.upload.max_bytes
            )));
        }

        let extracted = match self.extractor.extract(bytes, content_type) {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::warn!(name = filename, error = %e, "rejected upload");
                return Err(e.into());
            }
        };
        tracing::info!(
            name = filename,
            pages = extracted.page_count,
            bytes = bytes.len(),
            "extracted upload"
        );

        self.add_document(token, filename, &extracted.text, extracted.page_count, bytes.len())
            .await
    }

    /// Store a document whose text is already extracted, then rebuild the
    /// session index over the full document set.
    ///
    /// An embedding outage never fails the add: the document is kept and
    /// the index stays absent, so retrieval degrades to fallback search
    /// until a later rebuild succeeds.
    pub async fn add_document(
        &self,
        token: &str,
        name: &str,
        raw_text: &str,
        page_count: usize,
        byte_size: usize,
    ) -> Result<Document> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "document name must not be empty".to_string(),
            ));
        }

        let (slot, _) = self.sessions.get_or_create(Some(token)).await;
        let mut session = slot.lock().await;

        let document = Document {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            name: name.to_string(),
            full_text: raw_text.to_string(),
            page_count,
            byte_size,
            uploaded_at: Utc::now(),
        };
        session.documents.push(document.clone());

        self.rebuild_index(&mut session).await;
        Ok(document)
    }

    /// Remove one document and rebuild over the remainder. Returns `false`
    /// when the id is unknown in this session.
    pub async fn delete_document(&self, token: &str, document_id: &str) -> bool {
        let (slot, _) = self.sessions.get_or_create(Some(token)).await;
        let mut session = slot.lock().await;

        let before = session.documents.len();
        session.documents.retain(|d| d.id != document_id);
        if session.documents.len() == before {
            return false;
        }

        tracing::info!(session_id = %session.id, document_id, "deleted document");
        self.rebuild_index(&mut session).await;
        true
    }

    /// Drop every document and the index. Chat history is untouched.
    pub async fn clear_documents(&self, token: &str) {
        let (slot, _) = self.sessions.get_or_create(Some(token)).await;
        let mut session = slot.lock().await;
        session.documents.clear();
        session.index = None;
        tracing::info!(session_id = %session.id, "cleared documents");
    }

    /// Current documents of the session, in upload order.
    pub async fn list_documents(&self, token: &str) -> Vec<Document> {
        let (slot, _) = self.sessions.get_or_create(Some(token)).await;
        let session = slot.lock().await;
        session.documents.clone()
    }

    /// Rebuild the session's index from every document it holds.
    ///
    /// The old index is dropped before the first await, so a failed or
    /// cancelled rebuild leaves the session degraded but consistent (new
    /// document set, absent index) rather than serving stale vectors.
    async fn rebuild_index(&self, session: &mut Session) {
        session.index = None;

        let chunks: Vec<Chunk> = session
            .documents
            .iter()
            .flat_map(|doc| {
                chunk_document(
                    &doc.id,
                    &doc.full_text,
                    self.chunking.chunk_size,
                    self.chunking.overlap,
                )
            })
            .collect();
        if chunks.is_empty() {
            return;
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = match self.embedder.embed_batch(&texts).await {
            Ok(vectors) => vectors,
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id,
                    error = %e,
                    "embedding failed; index absent until next rebuild"
                );
                return;
            }
        };
        if vectors.len() != chunks.len() {
            tracing::warn!(
                session_id = %session.id,
                expected = chunks.len(),
                got = vectors.len(),
                "embedding count mismatch; index absent"
            );
            return;
        }

        let document_count = session.documents.len();
        let chunk_count = chunks.len();
        match VectorIndex::build(chunks.into_iter().zip(vectors).collect()) {
            Ok(index) => {
                session.index = Some(index);
                tracing::info!(
                    session_id = %session.id,
                    documents = document_count,
                    chunks = chunk_count,
                    "rebuilt vector index"
                );
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id,
                    error = %e,
                    "index build failed; index absent"
                );
            }
        }
    }
}
