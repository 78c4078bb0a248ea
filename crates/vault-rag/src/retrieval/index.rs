//! Flat in-memory vector index with exact cosine search

use crate::error::{Error, Result};
use crate::types::DocumentChunk;

/// A chunk returned from a query, with its similarity to the query vector
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

/// Immutable index over the chunks of one ingestion
///
/// Built once and swapped in whole; queries never observe a partial build.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    chunks: Vec<DocumentChunk>,
    vectors: Vec<Vec<f32>>,
    norms: Vec<f32>,
    dimensions: usize,
}

impl VectorIndex {
    /// Build an index from chunks and their vectors, paired by position
    pub fn build(chunks: Vec<DocumentChunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::validation(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if chunks.is_empty() {
            return Err(Error::validation("Cannot build an index without chunks"));
        }

        let dimensions = vectors[0].len();
        if dimensions == 0 {
            return Err(Error::validation("Vectors must not be empty"));
        }

        let mut norms = Vec::with_capacity(vectors.len());
        for (i, vector) in vectors.iter().enumerate() {
            if vector.len() != dimensions {
                return Err(Error::validation(format!(
                    "Vector {} has {} dimensions, expected {}",
                    i,
                    vector.len(),
                    dimensions
                )));
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(Error::validation(format!(
                    "Vector {} contains non-finite values",
                    i
                )));
            }
            norms.push(norm(vector));
        }

        tracing::debug!(
            "Built index with {} chunks ({} dimensions)",
            chunks.len(),
            dimensions
        );

        Ok(Self {
            chunks,
            vectors,
            norms,
            dimensions,
        })
    }

    /// Return up to `k` chunks ordered by descending similarity
    ///
    /// Equal similarities keep insertion order.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if vector.len() != self.dimensions {
            return Err(Error::validation(format!(
                "Query has {} dimensions, index has {}",
                vector.len(),
                self.dimensions
            )));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::validation("Query vector contains non-finite values"));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = norm(vector);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(i, (v, &n))| (i, cosine(vector, query_norm, v, n)))
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| ScoredChunk {
                chunk: self.chunks[i].clone(),
                similarity,
            })
            .collect())
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimensionality
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Distinct source names in insertion order
    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        for chunk in &self.chunks {
            if !sources.iter().any(|s| s == chunk.source_name()) {
                sources.push(chunk.source_name().to_string());
            }
        }
        sources
    }

    /// All chunks in insertion order
    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (dot / (a_norm * b_norm)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, source: &str, index: u32) -> DocumentChunk {
        DocumentChunk::new(text, source, 1, index)
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::build(
            vec![
                chunk("refunds", "policy.pdf", 0),
                chunk("shipping", "policy.pdf", 1),
                chunk("holidays", "handbook.pdf", 0),
            ],
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.6, 0.8, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_query_orders_by_similarity() {
        let index = sample_index();
        let results = index.query(&[1.0, 0.0, 0.0], 2).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text(), "refunds");
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
        assert_eq!(results[1].chunk.text(), "holidays");
        assert!((results[1].similarity - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_query_caps_at_index_size_and_zero_k() {
        let index = sample_index();
        assert_eq!(index.query(&[0.0, 0.0, 1.0], 10).unwrap().len(), 3);
        assert!(index.query(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = VectorIndex::build(
            vec![chunk("a", "x.pdf", 0), chunk("b", "x.pdf", 1), chunk("c", "x.pdf", 2)],
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]],
        )
        .unwrap();

        let results = index.query(&[1.0, 0.0], 2).unwrap();
        let texts: Vec<_> = results.iter().map(|r| r.chunk.text()).collect();
        assert_eq!(texts, ["b", "c"]);
    }

    #[test]
    fn test_build_rejects_mismatches() {
        let err = VectorIndex::build(vec![chunk("a", "x.pdf", 0)], vec![]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = VectorIndex::build(
            vec![chunk("a", "x.pdf", 0), chunk("b", "x.pdf", 1)],
            vec![vec![1.0, 0.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err =
            VectorIndex::build(vec![chunk("a", "x.pdf", 0)], vec![vec![f32::NAN, 0.0]]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_query_rejects_wrong_dimensions() {
        let index = sample_index();
        assert!(matches!(
            index.query(&[1.0, 0.0], 1),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            index.query(&[f32::INFINITY, 0.0, 0.0], 1),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_sources_in_insertion_order() {
        assert_eq!(sample_index().sources(), ["policy.pdf", "handbook.pdf"]);
    }
}
