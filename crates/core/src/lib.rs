pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod models;
pub mod orchestrator;
pub mod retrieval;
pub mod topics;
pub mod traits;

pub use chunking::ChunkerStrategy;
pub use embeddings::{
    CharacterNgramEmbedder, EmbeddingConfig, OpenAiEmbeddingGateway,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{EmbeddingError, IngestError, PipelineError, RetrievalError};
pub use extractor::{digest_bytes, extract_page_texts, LopdfExtractor, PageText, PdfExtractor};
pub use models::{
    Chunk, ChunkConfig, CitedResult, DocumentMetadata, ModelInfo, RetrievalConfig,
    RetrievalResult, TopicGrounding,
};
pub use orchestrator::DocumentSession;
pub use retrieval::{RetrievalIndex, SharedRetrievalIndex};
pub use topics::{find_topic_pages, ground_topics};
pub use traits::EmbeddingGateway;
