use crate::error::EmbeddingError;
use crate::models::ModelInfo;
use crate::traits::EmbeddingGateway;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;

/// Local, deterministic embedder over hashed character trigrams. Needs no
/// network, so it backs tests and offline runs.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.trim().to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        let grams: Vec<&[char]> = if chars.len() < 3 {
            vec![chars.as_slice()]
        } else {
            chars.windows(3).collect()
        };

        for gram in grams {
            let mut hash = 1469598103934665603u64;
            for ch in gram {
                hash ^= *ch as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingGateway for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "local".to_string(),
            model: "character-trigram".to_string(),
            dimensions: EmbeddingGateway::dimensions(self),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingConfig {
    pub model_name: String,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: "text-embedding-3-small".to_string(),
            endpoint: "https://api.openai.com/v1/".to_string(),
            api_key: None,
            batch_size: 32,
            timeout_secs: 30,
            dimensions: 1536,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.model_name.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig("model_name is empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.dimensions == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "dimensions must be greater than 0".to_string(),
            ));
        }
        Url::parse(&self.endpoint)?;
        Ok(())
    }

    fn embeddings_url(&self) -> Result<Url, EmbeddingError> {
        let mut base = Url::parse(&self.endpoint)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join("embeddings")?)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Gateway to an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbeddingGateway {
    client: Client,
    config: EmbeddingConfig,
    url: Url,
    api_key: String,
}

impl OpenAiEmbeddingGateway {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| EmbeddingError::InvalidConfig("API key not configured".to_string()))?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.embeddings_url()?,
            config,
            api_key,
        })
    }

    async fn request_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let payload = EmbeddingRequest {
            model: &self.config.model_name,
            input: batch,
        };

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::BackendResponse {
                backend: self.url.to_string(),
                details: format!("status {status}: {body}"),
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        ordered_vectors(parsed, batch.len(), self.config.dimensions, self.url.as_str())
    }
}

#[async_trait]
impl EmbeddingGateway for OpenAiEmbeddingGateway {
    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            model: self.config.model_name.clone(),
            dimensions: self.config.dimensions,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            debug!(batch = batch.len(), model = %self.config.model_name, "requesting embeddings");
            vectors.extend(self.request_batch(batch).await?);
        }
        Ok(vectors)
    }
}

fn ordered_vectors(
    response: EmbeddingResponse,
    expected: usize,
    dimensions: usize,
    backend: &str,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let invalid = |details: String| EmbeddingError::BackendResponse {
        backend: backend.to_string(),
        details,
    };

    if response.data.len() != expected {
        return Err(invalid(format!(
            "expected {expected} embeddings, got {}",
            response.data.len()
        )));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in response.data {
        if item.embedding.len() != dimensions {
            return Err(invalid(format!(
                "embedding dimension {} != {dimensions}",
                item.embedding.len()
            )));
        }
        match slots.get_mut(item.index) {
            Some(slot) if slot.is_none() => *slot = Some(item.embedding),
            _ => return Err(invalid(format!("unexpected embedding index {}", item.index))),
        }
    }

    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid("missing embedding index".to_string()))
}
