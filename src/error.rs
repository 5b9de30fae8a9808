//! Error taxonomy for the engine.
//!
//! Four outcomes matter to callers: bad input is rejected immediately
//! (`InvalidArgument`), a collaborator outage degrades service instead of
//! failing the request (`Unavailable`), an unparseable upload is rejected
//! with nothing stored (`Extraction`), and unknown ids surface as `false`
//! or empty results rather than errors.

use thiserror::Error;

/// Errors surfaced by the public engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected input: bad `k`, oversized payload, empty required field.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An upstream collaborator (embedding or generation) is down.
    ///
    /// Engine operations absorb this wherever a degraded path exists; it
    /// escapes only when a caller drives a collaborator directly.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// The uploaded bytes could not be turned into text. Nothing is stored.
    #[error(transparent)]
    Extraction(#[from] ExtractError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the text-extraction collaborator.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),
    #[error("corrupt document: {0}")]
    CorruptDocument(String),
}

/// The embedding service could not produce vectors.
#[derive(Debug, Clone, Error)]
#[error("embedding service unavailable: {0}")]
pub struct EmbeddingUnavailable(pub String);

/// The generation service could not produce an answer.
#[derive(Debug, Clone, Error)]
#[error("generation service unavailable: {0}")]
pub struct GenerationUnavailable(pub String);

impl From<EmbeddingUnavailable> for Error {
    fn from(e: EmbeddingUnavailable) -> Self {
        Error::Unavailable(e.to_string())
    }
}

impl From<GenerationUnavailable> for Error {
    fn from(e: GenerationUnavailable) -> Self {
        Error::Unavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_errors_map_to_unavailable() {
        let e: Error = EmbeddingUnavailable("connection refused".into()).into();
        assert!(matches!(e, Error::Unavailable(_)));
        assert!(e.to_string().contains("embedding service unavailable"));

        let e: Error = GenerationUnavailable("timed out".into()).into();
        assert!(matches!(e, Error::Unavailable(_)));
        assert!(e.to_string().contains("generation service unavailable"));
    }

    #[test]
    fn extraction_errors_keep_their_message() {
        let e: Error = ExtractError::UnsupportedFormat("text/csv".into()).into();
        assert_eq!(e.to_string(), "unsupported document format: text/csv");
    }
}
