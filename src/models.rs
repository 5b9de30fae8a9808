//! Core data types flowing through the engine.

use chrono::{DateTime, Utc};

/// An uploaded document, owned by exactly one session.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub session_id: String,
    pub name: String,
    pub full_text: String,
    pub page_count: usize,
    pub byte_size: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// A bounded slice of a document's text, recomputed on every index rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub hash: String,
}

/// One retrieval hit with provenance.
///
/// `score` is the cosine similarity when the hit came from the vector index
/// and `None` when it came from fallback sentence search.
#[derive(Debug, Clone)]
pub struct ChunkMatch {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub content: String,
    pub score: Option<f32>,
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of a session's bounded chat history.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Result of one chat exchange.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub answer: String,
    pub matches: Vec<ChunkMatch>,
    pub sources: Vec<String>,
}

/// Health snapshot for one session.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub generation_ready: bool,
    pub document_count: usize,
    pub index_ready: bool,
    pub session_id: String,
}

/// Output of the text-extraction collaborator.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
}
