use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use noteviz_core::{
    ground_topics, CharacterNgramEmbedder, ChunkConfig, ChunkerStrategy, DocumentSession,
    EmbeddingConfig, EmbeddingGateway, LopdfExtractor, OpenAiEmbeddingGateway, PdfExtractor,
    RetrievalConfig,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "noteviz", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Character budget per chunk
    #[arg(long, env = "NOTEVIZ_CHUNK_SIZE", default_value = "1000", global = true)]
    chunk_size: usize,

    /// Characters shared between consecutive chunks
    #[arg(long, env = "NOTEVIZ_CHUNK_OVERLAP", default_value = "200", global = true)]
    chunk_overlap: usize,

    /// How page text is cut into chunks
    #[arg(long, value_enum, default_value_t = StrategyArg::PageAware, global = true)]
    strategy: StrategyArg,

    /// Minimum cosine similarity for a search hit
    #[arg(long, env = "NOTEVIZ_SIMILARITY_THRESHOLD", default_value = "0.7", global = true)]
    similarity_threshold: f64,

    /// Maximum number of search hits
    #[arg(long, env = "NOTEVIZ_MAX_RESULTS", default_value = "5", global = true)]
    max_results: usize,

    /// Embedding backend used for search
    #[arg(long, value_enum, default_value_t = EmbedderArg::Openai, global = true)]
    embedder: EmbedderArg,

    /// Embedding model name
    #[arg(
        long,
        env = "NOTEVIZ_EMBEDDING_MODEL",
        default_value = "text-embedding-3-small",
        global = true
    )]
    embedding_model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(
        long,
        env = "NOTEVIZ_EMBEDDING_ENDPOINT",
        default_value = "https://api.openai.com/v1/",
        global = true
    )]
    embedding_endpoint: String,

    /// Vector dimensionality returned by the embedding model
    #[arg(long, env = "NOTEVIZ_EMBEDDING_DIMENSIONS", default_value = "1536", global = true)]
    embedding_dimensions: usize,

    /// Texts per embedding request
    #[arg(long, env = "NOTEVIZ_EMBEDDING_BATCH_SIZE", default_value = "32", global = true)]
    embedding_batch_size: usize,

    /// API key for the embedding endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    openai_api_key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the page-anchored chunks of a PDF as JSON lines.
    Chunks {
        #[arg(long)]
        pdf: PathBuf,
    },
    /// Print the PDF's document information.
    Metadata {
        #[arg(long)]
        pdf: PathBuf,
    },
    /// Embed a PDF and return the chunks most similar to a query.
    Search {
        #[arg(long)]
        pdf: PathBuf,
        /// Query text
        #[arg(long)]
        query: String,
    },
    /// List the pages on which each topic appears.
    Topics {
        #[arg(long)]
        pdf: PathBuf,
        /// Topic to ground; repeat for several.
        #[arg(long = "topic", required = true)]
        topics: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    PageAware,
    FixedWindow,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderArg {
    Ngram,
    Openai,
}

impl Cli {
    fn strategy(&self) -> anyhow::Result<ChunkerStrategy> {
        let config = ChunkConfig::new(self.chunk_size, self.chunk_overlap)?;
        Ok(match self.strategy {
            StrategyArg::PageAware => ChunkerStrategy::PageAware(config),
            StrategyArg::FixedWindow => ChunkerStrategy::FixedWindow(config),
        })
    }

    fn retrieval(&self) -> anyhow::Result<RetrievalConfig> {
        Ok(RetrievalConfig::new(self.similarity_threshold, self.max_results)?)
    }

    fn embedding(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            model_name: self.embedding_model.clone(),
            endpoint: self.embedding_endpoint.clone(),
            api_key: self.openai_api_key.clone(),
            batch_size: self.embedding_batch_size,
            dimensions: self.embedding_dimensions,
            ..EmbeddingConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    if let Err(error) = dotenvy::dotenv() {
        if !error.not_found() {
            return Err(error).context("failed to load .env");
        }
    }

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "noteviz boot"
    );

    let strategy = cli.strategy()?;
    let retrieval = cli.retrieval()?;

    match &cli.command {
        Command::Chunks { pdf } => {
            let pages = LopdfExtractor.extract_pages(pdf)?;
            for chunk in strategy.chunk_pages(&pages) {
                println!("{}", serde_json::to_string(&chunk)?);
            }
        }
        Command::Metadata { pdf } => {
            let metadata = LopdfExtractor.extract_metadata(pdf)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Topics { pdf, topics } => {
            let pages = LopdfExtractor.extract_pages(pdf)?;
            let chunks = strategy.chunk_pages(&pages);
            for grounding in ground_topics(&chunks, topics) {
                if grounding.pages.is_empty() {
                    warn!(topic = %grounding.topic, "topic not found in document");
                }
                println!("{}", serde_json::to_string(&grounding)?);
            }
        }
        Command::Search { pdf, query } => match cli.embedder {
            EmbedderArg::Ngram => {
                let session =
                    DocumentSession::new(strategy, CharacterNgramEmbedder::default(), retrieval);
                search(session, pdf, query).await?;
            }
            EmbedderArg::Openai => {
                let gateway = OpenAiEmbeddingGateway::new(cli.embedding())?;
                let session = DocumentSession::new(strategy, gateway, retrieval);
                search(session, pdf, query).await?;
            }
        },
    }

    Ok(())
}

async fn search<G: EmbeddingGateway>(
    mut session: DocumentSession<G>,
    pdf: &Path,
    query: &str,
) -> anyhow::Result<()> {
    let chunk_count = session.load_pdf(pdf).await?;
    info!(pdf = %pdf.display(), chunk_count, "pdf indexed");

    let results = session.query(query).await?;
    println!("query: {query}");
    if results.is_empty() {
        println!("no chunks met the similarity threshold");
    }

    for hit in results {
        println!(
            "[page {}] score={:.4} chars={}..{}",
            hit.page_number, hit.similarity, hit.start_char, hit.end_char
        );
        println!("  {}", hit.text.replace('\n', "\n  "));
    }

    Ok(())
}
