use crate::{EmbeddingError, ModelInfo};
use async_trait::async_trait;

/// Boundary to an embedding model. One call per batch of chunk texts or per
/// query; batching limits, rate limits, and retries live behind it.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    fn dimensions(&self) -> usize;

    fn model_info(&self) -> ModelInfo;

    /// Returns one vector per input text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("query text is empty".to_string()));
        }

        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        match (vectors.pop(), vectors.is_empty()) {
            (Some(vector), true) => Ok(vector),
            _ => Err(EmbeddingError::BackendResponse {
                backend: self.model_info().provider,
                details: "expected exactly one vector for a single query".to_string(),
            }),
        }
    }
}
