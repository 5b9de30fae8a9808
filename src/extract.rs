//! Text extraction for uploaded documents.
//!
//! Uploads arrive as raw bytes plus a declared content type; extraction
//! turns them into plain UTF-8 text and a page count. Only PDF is accepted.
//! A failed extraction rejects the upload; nothing is stored.

use crate::error::ExtractError;
use crate::models::ExtractedText;

/// MIME type accepted for upload.
pub const MIME_PDF: &str = "application/pdf";

/// Collaborator that turns uploaded bytes into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], content_type: &str) -> Result<ExtractedText, ExtractError>;
}

/// PDF extractor backed by `pdf_extract`, with the page count taken from
/// the parsed document structure.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8], content_type: &str) -> Result<ExtractedText, ExtractError> {
        if content_type != MIME_PDF {
            return Err(ExtractError::UnsupportedFormat(content_type.to_string()));
        }

        let document = lopdf::Document::load_mem(bytes)
            .map_err(|e| ExtractError::CorruptDocument(e.to_string()))?;
        let page_count = document.get_pages().len();

        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractError::CorruptDocument(e.to_string()))?;

        Ok(ExtractedText { text, page_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_content_type_returns_error() {
        let err = PdfExtractor
            .extract(b"foo", "application/octet-stream")
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn plain_text_content_type_returns_error() {
        let err = PdfExtractor.extract(b"hello", "text/plain").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = PdfExtractor.extract(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::CorruptDocument(_)));
    }
}
