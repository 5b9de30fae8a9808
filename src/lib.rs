//! # Docchat
//!
//! A session-scoped document chat engine: upload PDFs, ask questions, get
//! answers grounded in the uploaded content.
//!
//! Docchat owns the ingestion and retrieval pipeline (chunking extracted
//! text, embedding chunks, holding an in-memory similarity index per
//! session, and serving top-k context for each question) while PDF parsing,
//! embedding, and answer generation remain pluggable collaborators. Every
//! session is an isolated container of documents, index, and chat history
//! behind an opaque token; an idle sweep evicts abandoned sessions.
//!
//! ## Architecture
//!
//! ```text
//! upload ──▶ DocumentManager ──▶ chunk ──▶ embed ──▶ VectorIndex
//!                                                        │ (per session)
//! question ──▶ Chatbot ──▶ Retrieval ────────────────────┤
//!                 │             └─ sentence fallback ◀───┘ (index absent)
//!                 └──▶ AnswerGenerator
//! ```
//!
//! The index is rebuilt from scratch on every document change, so it always
//! reflects exactly the session's current document set.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn run() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use docchat::{chat, config, documents, embedding, extract, generation, search, session};
//!
//! let cfg = config::load_config(std::path::Path::new("docchat.toml"))?;
//! let store = Arc::new(session::SessionStore::new(cfg.session.clone()));
//! let embedder = embedding::create_embedder(&cfg.embedding)?;
//! let generator = generation::create_generator(&cfg.generation)?;
//! let manager = documents::DocumentManager::new(
//!     store.clone(),
//!     Arc::new(extract::PdfExtractor),
//!     embedder.clone(),
//!     &cfg,
//! );
//! let retrieval = Arc::new(search::Retrieval::new(store.clone(), embedder, &cfg));
//! let chatbot = chat::Chatbot::new(store.clone(), retrieval, generator, &cfg);
//! session::spawn_sweeper(store.clone());
//!
//! let (_, token) = store.get_or_create(None).await;
//! let bytes = std::fs::read("report.pdf")?;
//! manager.upload(&token, "report.pdf", extract::MIME_PDF, &bytes).await?;
//! let reply = chatbot.chat(&token, "What does the report conclude?").await?;
//! println!("{}", reply.answer);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`extract`] | Upload text extraction (PDF) |
//! | [`chunk`] | Recursive overlapping text splitting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generation`] | Answer generation abstraction |
//! | [`index`] | In-memory vector index |
//! | [`session`] | Session store and idle sweep |
//! | [`documents`] | Document lifecycle and index rebuild |
//! | [`search`] | Retrieval with sentence fallback |
//! | [`chat`] | Chat orchestration |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod documents;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod models;
pub mod search;
pub mod session;
