use crate::chunking::ChunkerStrategy;
use crate::error::{IngestError, PipelineError};
use crate::extractor::{LopdfExtractor, PageText, PdfExtractor};
use crate::models::{
    Chunk, CitedResult, DocumentMetadata, RetrievalConfig, RetrievalResult, TopicGrounding,
};
use crate::retrieval::SharedRetrievalIndex;
use crate::topics;
use crate::traits::EmbeddingGateway;
use std::path::Path;
use tracing::{debug, info};

/// One document's journey from pages to a queryable index: chunk, embed,
/// index, then answer similarity queries and topic lookups against it.
pub struct DocumentSession<G>
where
    G: EmbeddingGateway,
{
    strategy: ChunkerStrategy,
    gateway: G,
    index: SharedRetrievalIndex,
    chunks: Vec<Chunk>,
    metadata: Option<DocumentMetadata>,
}

impl<G> DocumentSession<G>
where
    G: EmbeddingGateway,
{
    pub fn new(strategy: ChunkerStrategy, gateway: G, retrieval: RetrievalConfig) -> Self {
        Self {
            strategy,
            gateway,
            index: SharedRetrievalIndex::new(retrieval),
            chunks: Vec::new(),
            metadata: None,
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn metadata(&self) -> Option<&DocumentMetadata> {
        self.metadata.as_ref()
    }

    pub fn index(&self) -> &SharedRetrievalIndex {
        &self.index
    }

    /// Chunks, embeds, and indexes `pages`, replacing whatever the session
    /// held. Returns the number of chunks indexed. On error the previous
    /// document stays loaded.
    pub async fn load_pages(&mut self, pages: &[PageText]) -> Result<usize, PipelineError> {
        let chunks = self.strategy.chunk_pages(pages);
        if chunks.is_empty() {
            return Err(PipelineError::NoContent(format!(
                "{} page(s) contained no text",
                pages.len()
            )));
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.gateway.embed_batch(&texts).await?;
        debug!(chunks = texts.len(), vectors = vectors.len(), "embedded chunks");

        self.index.index(texts, vectors).await?;
        self.chunks = chunks;

        info!(
            pages = pages.len(),
            chunks = self.chunks.len(),
            model = %self.gateway.model_info().model,
            "document indexed"
        );
        Ok(self.chunks.len())
    }

    pub async fn load_pdf_bytes(&mut self, bytes: Vec<u8>) -> Result<usize, PipelineError> {
        let (pages, metadata) = tokio::task::spawn_blocking(move || {
            let extractor = LopdfExtractor;
            let pages = extractor.extract_pages_from_bytes(&bytes)?;
            let metadata = extractor.extract_metadata_from_bytes(&bytes)?;
            Ok::<_, IngestError>((pages, metadata))
        })
        .await
        .map_err(|error| IngestError::PdfParse(format!("extraction task failed: {error}")))??;

        let count = self.load_pages(&pages).await?;
        self.metadata = Some(metadata);
        Ok(count)
    }

    pub async fn load_pdf(&mut self, path: &Path) -> Result<usize, PipelineError> {
        if path.file_name().is_none() {
            return Err(IngestError::MissingFileName(path.display().to_string()).into());
        }

        let bytes = tokio::fs::read(path).await.map_err(IngestError::Io)?;
        info!(path = %path.display(), bytes = bytes.len(), "loading pdf");
        self.load_pdf_bytes(bytes).await
    }

    /// Plain `(text, similarity)` results for downstream prompt building.
    pub async fn relevant_chunks(
        &self,
        query: &str,
    ) -> Result<Vec<RetrievalResult>, PipelineError> {
        let query_vector = self.gateway.embed_query(query).await?;
        Ok(self.index.find_relevant_chunks(&query_vector).await?)
    }

    /// Ranked results carrying the page and offsets of their chunk.
    pub async fn query(&self, query: &str) -> Result<Vec<CitedResult>, PipelineError> {
        let query_vector = self.gateway.embed_query(query).await?;
        let ranked = self.index.rank(&query_vector).await?;

        Ok(ranked
            .into_iter()
            .filter_map(|(position, similarity)| {
                self.chunks.get(position).map(|chunk| CitedResult {
                    text: chunk.text.clone(),
                    similarity,
                    page_number: chunk.page_number,
                    start_char: chunk.start_char,
                    end_char: chunk.end_char,
                })
            })
            .collect())
    }

    pub fn topic_pages(&self, topic: &str) -> Vec<u32> {
        topics::find_topic_pages(&self.chunks, topic)
    }

    pub fn ground_topics<S: AsRef<str>>(&self, names: &[S]) -> Vec<TopicGrounding> {
        topics::ground_topics(&self.chunks, names)
    }
}
