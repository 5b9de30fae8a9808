//! Immutable per-session vector index.
//!
//! Built in one shot from every (chunk, embedding) pair of a session and
//! replaced wholesale on any document change; queries never mutate it. An
//! index therefore always reflects exactly the document set it was built
//! from, so staleness is impossible by construction. A session with no
//! chunks keeps no index at all rather than an empty one.

use crate::embedding::cosine_similarity;
use crate::error::{Error, Result};
use crate::models::{Chunk, ChunkMatch};

/// One indexed chunk and its embedding.
#[derive(Debug, Clone)]
struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Brute-force cosine similarity index over a session's chunks.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<Entry>,
    dims: usize,
}

impl VectorIndex {
    /// Build an index from chunks and their embeddings.
    ///
    /// Fails when the input is empty, when vector lengths disagree, or when
    /// a vector contains a non-finite value.
    pub fn build(items: Vec<(Chunk, Vec<f32>)>) -> Result<Self> {
        let dims = match items.first() {
            Some((_, vector)) => vector.len(),
            None => {
                return Err(Error::InvalidArgument(
                    "cannot build an index from zero chunks".to_string(),
                ))
            }
        };
        if dims == 0 {
            return Err(Error::InvalidArgument(
                "embedding vectors must not be empty".to_string(),
            ));
        }

        for (chunk, vector) in &items {
            if vector.len() != dims {
                return Err(Error::InvalidArgument(format!(
                    "embedding for chunk {} has {} dims, expected {}",
                    chunk.id,
                    vector.len(),
                    dims
                )));
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(Error::InvalidArgument(format!(
                    "embedding for chunk {} contains a non-finite value",
                    chunk.id
                )));
            }
        }

        let entries = items
            .into_iter()
            .map(|(chunk, vector)| Entry { chunk, vector })
            .collect();

        Ok(Self { entries, dims })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Ids of the documents this index was built from, in insertion order.
    pub fn document_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !ids.iter().any(|id| id == &entry.chunk.document_id) {
                ids.push(entry.chunk.document_id.clone());
            }
        }
        ids
    }

    /// Top-`k` chunks by cosine similarity against `query_vector`, highest
    /// first.
    ///
    /// The sort is stable, so equal scores keep insertion order. A `k`
    /// larger than the corpus returns the whole corpus.
    pub fn query(&self, query_vector: &[f32], k: usize) -> Result<Vec<ChunkMatch>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be >= 1".to_string()));
        }
        if query_vector.len() != self.dims {
            return Err(Error::InvalidArgument(format!(
                "query vector has {} dims, index has {}",
                query_vector.len(),
                self.dims
            )));
        }
        if query_vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidArgument(
                "query vector contains a non-finite value".to_string(),
            ));
        }

        let mut scored: Vec<(f32, &Entry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query_vector, &entry.vector), entry))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| ChunkMatch {
                chunk_id: entry.chunk.id.clone(),
                document_id: entry.chunk.document_id.clone(),
                chunk_index: entry.chunk.chunk_index,
                content: entry.chunk.text.clone(),
                score: Some(score),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chunk(id: &str, doc: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            document_id: doc.to_string(),
            chunk_index: 0,
            text: format!("text of {}", id),
            hash: String::new(),
        }
    }

    fn make_index(vectors: &[(&str, Vec<f32>)]) -> VectorIndex {
        let items = vectors
            .iter()
            .map(|(id, v)| (make_chunk(id, "doc1"), v.clone()))
            .collect();
        VectorIndex::build(items).unwrap()
    }

    #[test]
    fn test_build_rejects_empty_input() {
        assert!(VectorIndex::build(Vec::new()).is_err());
    }

    #[test]
    fn test_build_rejects_dim_mismatch() {
        let items = vec![
            (make_chunk("a", "doc1"), vec![1.0, 0.0]),
            (make_chunk("b", "doc1"), vec![1.0, 0.0, 0.0]),
        ];
        assert!(VectorIndex::build(items).is_err());
    }

    #[test]
    fn test_build_rejects_non_finite_values() {
        let items = vec![(make_chunk("a", "doc1"), vec![1.0, f32::NAN])];
        assert!(VectorIndex::build(items).is_err());
    }

    #[test]
    fn test_query_orders_by_similarity() {
        let index = make_index(&[
            ("far", vec![0.0, 1.0]),
            ("mid", vec![0.7, 0.7]),
            ("near", vec![1.0, 0.0]),
        ]);
        let matches = index.query(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!(matches[0].score.unwrap() > matches[1].score.unwrap());
        assert!(matches[1].score.unwrap() > matches[2].score.unwrap());
    }

    #[test]
    fn test_query_rejects_k_zero() {
        let index = make_index(&[("a", vec![1.0, 0.0])]);
        assert!(index.query(&[1.0, 0.0], 0).is_err());
    }

    #[test]
    fn test_query_rejects_dim_mismatch() {
        let index = make_index(&[("a", vec![1.0, 0.0])]);
        assert!(index.query(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_query_k_exceeding_corpus_returns_all() {
        let index = make_index(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        let matches = index.query(&[1.0, 0.0], 50).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_query_ties_keep_insertion_order() {
        // Same direction, different magnitude: identical cosine scores.
        let index = make_index(&[("first", vec![1.0, 0.0]), ("second", vec![2.0, 0.0])]);
        let matches = index.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(matches[0].chunk_id, "first");
        assert_eq!(matches[1].chunk_id, "second");
    }

    #[test]
    fn test_document_ids_deduplicated_in_order() {
        let items = vec![
            (make_chunk("a", "doc1"), vec![1.0]),
            (make_chunk("b", "doc2"), vec![1.0]),
            (make_chunk("c", "doc1"), vec![1.0]),
        ];
        let index = VectorIndex::build(items).unwrap();
        assert_eq!(index.document_ids(), vec!["doc1", "doc2"]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.dims(), 1);
    }
}
