//! Chat orchestration over retrieval and generation.
//!
//! Each question retrieves context chunks, renders them with the recent
//! conversation into a single prompt, and asks the generator for an answer.
//! A generation outage produces a canned apology instead of an error, and
//! the history is left untouched so the failed exchange can be retried
//! without poisoning later prompts.

use std::sync::Arc;

use crate::config::{Config, HistoryConfig};
use crate::error::{Error, Result};
use crate::generation::AnswerGenerator;
use crate::models::{ChatReply, ChatRole, ChatTurn, EngineStatus};
use crate::search::Retrieval;
use crate::session::SessionStore;

/// Shown as context when the session has no documents or nothing matched.
const EMPTY_CONTEXT: &str = "No documents uploaded.";

/// Answers questions about a session's documents.
pub struct Chatbot {
    sessions: Arc<SessionStore>,
    retrieval: Arc<Retrieval>,
    generator: Arc<dyn AnswerGenerator>,
    history: HistoryConfig,
    chat_k: usize,
}

impl Chatbot {
    pub fn new(
        sessions: Arc<SessionStore>,
        retrieval: Arc<Retrieval>,
        generator: Arc<dyn AnswerGenerator>,
        config: &Config,
    ) -> Self {
        Self {
            sessions,
            retrieval,
            generator,
            history: config.history.clone(),
            chat_k: config.retrieval.chat_k,
        }
    }

    /// Answer a question from the session's documents.
    ///
    /// Retrieved chunks come back in `matches` with one `"Source N"` label
    /// each, so callers can show provenance next to the answer.
    pub async fn chat(&self, token: &str, question: &str) -> Result<ChatReply> {
        if question.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "question must not be empty".to_string(),
            ));
        }

        let matches = self.retrieval.search(token, question, self.chat_k).await?;
        let context = if matches.is_empty() {
            EMPTY_CONTEXT.to_string()
        } else {
            matches
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let recent = self.recent_history(token, self.history.prompt_turns).await;
        let prompt = render_prompt(&recent, &context, question);

        let answer = match self.generator.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "generation failed; returning canned answer");
                return Ok(ChatReply {
                    answer: apology(question),
                    matches: Vec::new(),
                    sources: Vec::new(),
                });
            }
        };

        self.append_turn(token, ChatRole::User, question).await;
        self.append_turn(token, ChatRole::Assistant, &answer).await;

        let sources = (1..=matches.len()).map(|i| format!("Source {}", i)).collect();
        tracing::debug!(matches = matches.len(), "chat answered");
        Ok(ChatReply {
            answer,
            matches,
            sources,
        })
    }

    /// Append one turn, dropping the oldest turns beyond the retention
    /// window.
    pub async fn append_turn(&self, token: &str, role: ChatRole, content: &str) {
        let (slot, _) = self.sessions.get_or_create(Some(token)).await;
        let mut session = slot.lock().await;
        session.chat_history.push(ChatTurn {
            role,
            content: content.to_string(),
        });
        if session.chat_history.len() > self.history.max_turns {
            let excess = session.chat_history.len() - self.history.max_turns;
            session.chat_history.drain(..excess);
        }
    }

    /// The most recent `n` turns, oldest first.
    pub async fn recent_history(&self, token: &str, n: usize) -> Vec<ChatTurn> {
        let (slot, _) = self.sessions.get_or_create(Some(token)).await;
        let session = slot.lock().await;
        let skip = session.chat_history.len().saturating_sub(n);
        session.chat_history[skip..].to_vec()
    }

    /// Forget the conversation; documents and index stay.
    pub async fn clear_history(&self, token: &str) {
        let (slot, _) = self.sessions.get_or_create(Some(token)).await;
        slot.lock().await.chat_history.clear();
    }

    /// Health snapshot for the session behind `token`.
    pub async fn status(&self, token: &str) -> EngineStatus {
        let (slot, resolved) = self.sessions.get_or_create(Some(token)).await;
        let (document_count, index_ready) = {
            let session = slot.lock().await;
            (session.documents.len(), session.index.is_some())
        };
        let generation_ready = self.generator.is_ready().await;
        EngineStatus {
            generation_ready,
            document_count,
            index_ready,
            session_id: resolved,
        }
    }
}

/// Render the generation prompt: recent conversation (when present), then
/// context chunks, then the question.
fn render_prompt(history: &[ChatTurn], context: &str, question: &str) -> String {
    let mut prompt = String::from("\n");
    if !history.is_empty() {
        prompt.push_str("Previous conversation:\n");
        for turn in history {
            prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "Context from documents: {}\nQuestion: {}\nAnswer briefly based on the context and conversation:",
        context, question
    ));
    prompt
}

/// Canned reply when the generator is unreachable. Names the question so
/// the user can retry it verbatim.
fn apology(question: &str) -> String {
    format!(
        "I apologize, but I encountered an error while processing your question: \"{}\".\n\n\
         This could be due to:\n\
         - The language model service not running\n\
         - Network connectivity issues\n\
         - The model not being available\n\n\
         Please try again once the model service is reachable.",
        question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_history() {
        let prompt = render_prompt(&[], "Alice has a red ball.", "What color is the ball?");
        assert_eq!(
            prompt,
            "\nContext from documents: Alice has a red ball.\n\
             Question: What color is the ball?\n\
             Answer briefly based on the context and conversation:"
        );
    }

    #[test]
    fn test_prompt_with_history() {
        let history = vec![
            ChatTurn {
                role: ChatRole::User,
                content: "Who has a ball?".to_string(),
            },
            ChatTurn {
                role: ChatRole::Assistant,
                content: "Alice does.".to_string(),
            },
        ];
        let prompt = render_prompt(&history, "Alice has a red ball.", "What color is it?");
        assert!(prompt.starts_with(
            "\nPrevious conversation:\nuser: Who has a ball?\nassistant: Alice does.\n\n"
        ));
        assert!(prompt.ends_with("Answer briefly based on the context and conversation:"));
    }

    #[test]
    fn test_apology_names_the_question() {
        let text = apology("What color is the ball?");
        assert!(text.contains("\"What color is the ball?\""));
        assert!(text.starts_with("I apologize"));
    }
}
