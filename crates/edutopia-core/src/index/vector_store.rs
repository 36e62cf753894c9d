//! Ephemeral in-memory vector index
//!
//! Holds the embedded chunks of one knowledge base. Small indexes are
//! searched by brute force; at `ANN_THRESHOLD` vectors and above an HNSW
//! graph is built once at construction time.

use super::chunker::Chunk;
use crate::error::{EdutopiaError, Result};
use crate::llm::Embedder;
use instant_distance::{Builder, HnswMap, Search};
use serde::Serialize;
use std::sync::Arc;

/// Minimum embedding count to justify building an ANN index.
/// Below this threshold, brute-force is fast enough.
const ANN_THRESHOLD: usize = 1000;

const EMBED_BATCH_SIZE: usize = 32;

/// Wrapper for f32 vectors implementing instant_distance::Point
#[derive(Clone)]
struct EmbeddingPoint {
    values: Vec<f32>,
}

impl instant_distance::Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        // Cosine distance = 1.0 - cosine_similarity
        1.0 - cosine_similarity(&self.values, &other.values)
    }
}

/// Retrieved chunk with its cosine similarity to the query
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub text: String,
    pub seq: usize,
    pub score: f32,
}

/// In-memory vector store for one knowledge base
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    ann: Option<HnswMap<EmbeddingPoint, usize>>,
    embedder: Arc<dyn Embedder>,
}

impl VectorIndex {
    /// Embed chunks and build the index
    pub async fn build(chunks: Vec<Chunk>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            embeddings.extend(embedder.embed_batch(batch).await?);
        }
        tracing::debug!(
            "Embedded {} chunks with {}",
            embeddings.len(),
            embedder.model_name()
        );
        Self::from_embeddings(chunks, embeddings, embedder)
    }

    /// Build the index from precomputed embeddings
    pub fn from_embeddings(
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(EdutopiaError::Index(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let ann = if embeddings.len() >= ANN_THRESHOLD {
            let points: Vec<EmbeddingPoint> = embeddings
                .iter()
                .map(|values| EmbeddingPoint {
                    values: values.clone(),
                })
                .collect();
            let keys: Vec<usize> = (0..points.len()).collect();
            tracing::info!("Built ANN index with {} embeddings", points.len());
            Some(Builder::default().build(points, keys))
        } else {
            None
        };

        Ok(Self {
            chunks,
            embeddings,
            ann,
            embedder,
        })
    }

    /// Embed the query and return the `k` most similar chunks, best first
    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed(query).await?;
        Ok(self.search_by_vector(&query_embedding, k))
    }

    /// Return the `k` chunks closest to an already embedded query
    pub fn search_by_vector(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let hits: Vec<(usize, f32)> = match self.ann {
            Some(ref map) => {
                let point = EmbeddingPoint {
                    values: query.to_vec(),
                };
                let mut search = Search::default();
                map.search(&point, &mut search)
                    .take(k)
                    .map(|item| (*item.value, 1.0 - item.distance))
                    .collect()
            }
            None => {
                let mut scored: Vec<(usize, f32)> = self
                    .embeddings
                    .iter()
                    .enumerate()
                    .map(|(i, embedding)| (i, cosine_similarity(query, embedding)))
                    .collect();
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
                scored.truncate(k);
                scored
            }
        };

        hits.into_iter()
            .map(|(i, score)| ScoredChunk {
                text: self.chunks[i].text.clone(),
                seq: self.chunks[i].seq,
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.text.as_str())
    }

    /// Whether the HNSW index has been built
    pub fn is_ann(&self) -> bool {
        self.ann.is_some()
    }
}

/// Cosine similarity of two vectors; 0.0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
