//! Exact cosine-similarity search over an in-memory corpus.
//!
//! Zero-norm handling: a query with zero norm is rejected with
//! [`RetrievalError::DegenerateVector`], since no score against it is
//! defined. A corpus vector with zero norm scores exactly `0.0`.

use crate::error::RetrievalError;
use crate::models::{RetrievalConfig, RetrievalResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug)]
struct Corpus {
    texts: Vec<String>,
    vectors: Vec<Vec<f32>>,
    norms: Vec<f64>,
    dimensions: usize,
}

#[derive(Debug)]
pub struct RetrievalIndex {
    config: RetrievalConfig,
    corpus: Option<Corpus>,
}

impl RetrievalIndex {
    pub fn new(config: RetrievalConfig) -> Self {
        Self {
            config,
            corpus: None,
        }
    }

    pub fn len(&self) -> usize {
        self.corpus.as_ref().map_or(0, |corpus| corpus.texts.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.corpus.as_ref().map(|corpus| corpus.dimensions)
    }

    /// Replaces the whole corpus. On error the previous corpus is kept.
    pub fn index(
        &mut self,
        texts: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), RetrievalError> {
        if texts.len() != vectors.len() {
            return Err(RetrievalError::InvalidInput(format!(
                "number of texts ({}) and embeddings ({}) must match",
                texts.len(),
                vectors.len()
            )));
        }
        if texts.is_empty() {
            return Err(RetrievalError::InvalidInput(
                "no texts provided for indexing".to_string(),
            ));
        }

        let dimensions = vectors[0].len();
        if dimensions == 0 {
            return Err(RetrievalError::InvalidInput(
                "embeddings must not be empty".to_string(),
            ));
        }

        let mut norms = Vec::with_capacity(vectors.len());
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimensions {
                return Err(RetrievalError::InvalidInput(format!(
                    "embedding {position} has dimension {}, expected {dimensions}",
                    vector.len()
                )));
            }
            if vector.iter().any(|value| !value.is_finite()) {
                return Err(RetrievalError::InvalidInput(format!(
                    "embedding {position} contains a non-finite value"
                )));
            }
            let vector_norm = norm(vector);
            if vector_norm == 0.0 {
                warn!(position, "zero-norm embedding indexed; it will always score 0.0");
            }
            norms.push(vector_norm);
        }

        info!(entries = texts.len(), dimensions, "retrieval corpus replaced");
        self.corpus = Some(Corpus {
            texts,
            vectors,
            norms,
            dimensions,
        });
        Ok(())
    }

    /// Corpus positions and similarities of the results, best first,
    /// already cut by threshold and result limit.
    pub fn rank(&self, query: &[f32]) -> Result<Vec<(usize, f64)>, RetrievalError> {
        let corpus = self.corpus.as_ref().ok_or(RetrievalError::EmptyIndex)?;

        if query.len() != corpus.dimensions {
            return Err(RetrievalError::InvalidInput(format!(
                "query dimension {} does not match corpus dimension {}",
                query.len(),
                corpus.dimensions
            )));
        }
        if query.iter().any(|value| !value.is_finite()) {
            return Err(RetrievalError::InvalidInput(
                "query embedding contains a non-finite value".to_string(),
            ));
        }

        let query_norm = norm(query);
        if query_norm == 0.0 {
            return Err(RetrievalError::DegenerateVector(
                "query embedding has zero norm".to_string(),
            ));
        }

        let mut scored: Vec<(usize, f64)> = corpus
            .vectors
            .iter()
            .zip(&corpus.norms)
            .enumerate()
            .map(|(position, (vector, &vector_norm))| {
                let similarity = if vector_norm == 0.0 {
                    0.0
                } else {
                    dot(vector, query) / (vector_norm * query_norm)
                };
                (position, similarity)
            })
            .collect();

        // Stable: equal scores keep corpus order.
        scored.sort_by(|left, right| right.1.total_cmp(&left.1));

        let threshold = self.config.similarity_threshold();
        let ranked: Vec<(usize, f64)> = scored
            .into_iter()
            .take_while(|(_, similarity)| *similarity >= threshold)
            .take(self.config.max_results())
            .collect();

        info!(
            corpus = corpus.texts.len(),
            results = ranked.len(),
            threshold,
            "ranked corpus against query"
        );
        Ok(ranked)
    }

    pub fn find_relevant_chunks(
        &self,
        query: &[f32],
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let ranked = self.rank(query)?;
        let texts = self
            .corpus
            .as_ref()
            .map(|corpus| corpus.texts.as_slice())
            .unwrap_or_default();

        Ok(ranked
            .into_iter()
            .map(|(position, similarity)| RetrievalResult {
                text: texts[position].clone(),
                similarity,
            })
            .collect())
    }
}

/// A [`RetrievalIndex`] behind a read-write lock: `index` takes the write
/// side, queries share the read side.
#[derive(Debug, Clone)]
pub struct SharedRetrievalIndex {
    inner: Arc<RwLock<RetrievalIndex>>,
}

impl SharedRetrievalIndex {
    pub fn new(config: RetrievalConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RetrievalIndex::new(config))),
        }
    }

    pub async fn index(
        &self,
        texts: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), RetrievalError> {
        self.inner.write().await.index(texts, vectors)
    }

    pub async fn rank(&self, query: &[f32]) -> Result<Vec<(usize, f64)>, RetrievalError> {
        self.inner.read().await.rank(query)
    }

    pub async fn find_relevant_chunks(
        &self,
        query: &[f32],
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        self.inner.read().await.find_relevant_chunks(query)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

fn dot(left: &[f32], right: &[f32]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(&a, &b)| f64::from(a) * f64::from(b))
        .sum()
}

fn norm(vector: &[f32]) -> f64 {
    dot(vector, vector).sqrt()
}
