use crate::error::{IngestError, RetrievalError};
use serde::{Deserialize, Serialize};

/// A page-anchored slice of extracted text. Offsets are char positions in
/// the raw page text; `text` is the trimmed content of that span.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub page_number: u32,
    pub start_char: usize,
    pub end_char: usize,
}

impl Chunk {
    pub fn new(
        text: impl Into<String>,
        page_number: u32,
        start_char: usize,
        end_char: usize,
    ) -> Self {
        Self {
            text: text.into(),
            page_number,
            start_char,
            end_char,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Overlap actually applied between consecutive chunks: never more than
    /// half the chunk budget.
    pub fn effective_overlap(&self) -> usize {
        self.chunk_overlap.min(self.chunk_size / 2)
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RetrievalConfig {
    similarity_threshold: f64,
    max_results: usize,
}

impl RetrievalConfig {
    pub fn new(similarity_threshold: f64, max_results: usize) -> Result<Self, RetrievalError> {
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(RetrievalError::InvalidConfig(format!(
                "similarity_threshold must be between 0 and 1, got {similarity_threshold}"
            )));
        }
        if max_results == 0 {
            return Err(RetrievalError::InvalidConfig(
                "max_results must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            similarity_threshold,
            max_results,
        })
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            max_results: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub text: String,
    pub similarity: f64,
}

/// A retrieval hit joined back to the chunk it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CitedResult {
    pub text: String,
    pub similarity: f64,
    pub page_number: u32,
    pub start_char: usize,
    pub end_char: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicGrounding {
    pub topic: String,
    pub pages: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub creator: String,
    pub producer: String,
    pub num_pages: usize,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_config_rejects_zero_size() {
        assert!(matches!(
            ChunkConfig::new(0, 0),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }

    #[test]
    fn chunk_config_rejects_overlap_not_below_size() {
        assert!(ChunkConfig::new(10, 10).is_err());
        assert!(ChunkConfig::new(10, 25).is_err());
        assert!(ChunkConfig::new(10, 9).is_ok());
    }

    #[test]
    fn effective_overlap_is_clamped_to_half_the_budget() {
        let config = ChunkConfig::new(10, 9).unwrap();
        assert_eq!(config.effective_overlap(), 5);

        let config = ChunkConfig::new(100, 20).unwrap();
        assert_eq!(config.effective_overlap(), 20);
    }

    #[test]
    fn retrieval_config_validates_bounds() {
        assert!(RetrievalConfig::new(-0.1, 5).is_err());
        assert!(RetrievalConfig::new(1.1, 5).is_err());
        assert!(RetrievalConfig::new(f64::NAN, 5).is_err());
        assert_eq!(
            RetrievalConfig::new(0.5, 0),
            Err(RetrievalError::InvalidConfig(
                "max_results must be greater than 0".to_string()
            ))
        );

        let config = RetrievalConfig::new(0.0, 1).unwrap();
        assert_eq!(config.similarity_threshold(), 0.0);
        assert_eq!(config.max_results(), 1);
    }

    #[test]
    fn defaults_match_documented_values() {
        let chunk = ChunkConfig::default();
        assert_eq!((chunk.chunk_size(), chunk.chunk_overlap()), (1_000, 200));

        let retrieval = RetrievalConfig::default();
        assert_eq!(retrieval.similarity_threshold(), 0.7);
        assert_eq!(retrieval.max_results(), 5);
    }
}
