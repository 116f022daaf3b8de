use clap::{Parser, Subcommand};
use docdex_embed::{EmbeddingProvider, FastEmbedProvider, HashEmbedProvider};
use docdex_retriever::config::{FileConfig, SyncConfig};
use docdex_retriever::index::SqliteVectorIndex;
use docdex_retriever::retrieval::{ChatAnswerGenerator, Retriever};
use docdex_retriever::sync::Reconciler;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// Keep a vector index in sync with a document directory and ask
/// questions over it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a docdex.toml configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the source directory from the config
    #[arg(long)]
    root: Option<PathBuf>,

    /// Override the index directory from the config
    #[arg(long)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty index
    Init,
    /// Reconcile the index with the source directory
    Sync {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Ask a question over the indexed documents
    Ask {
        /// The question to answer
        question: String,
        /// Number of chunks to retrieve
        #[arg(short, long)]
        k: Option<usize>,
        /// Chat completions API root
        #[arg(long, default_value = "https://api.openai.com/v1")]
        answer_url: String,
        /// Chat model name
        #[arg(long, default_value = "gpt-4o-mini")]
        answer_model: String,
    },
    /// List indexed entries
    List {
        /// Only entries from this source
        #[arg(long)]
        source: Option<String>,
        /// Limit number of results
        #[arg(short, long, default_value_t = 100)]
        limit: usize,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show index statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(args: &Args) -> anyhow::Result<SyncConfig> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let mut config = file.into_sync_config();
    if let Some(root) = &args.root {
        config.root = root.clone();
    }
    if let Some(index_dir) = &args.index_dir {
        config.index_dir = index_dir.clone();
    }
    Ok(config)
}

async fn build_provider(config: &SyncConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    if config.embedding.model_name == "hash" {
        Ok(Arc::new(HashEmbedProvider::new(256)))
    } else {
        Ok(Arc::new(
            FastEmbedProvider::create(config.embedding.clone()).await?,
        ))
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Commands::Init => {
            let _index = SqliteVectorIndex::open(&config.index_dir).await?;
            println!("Initialized index at {}", config.index_dir.display());
            Ok(())
        }
        Commands::Sync { format } => {
            let index = Arc::new(SqliteVectorIndex::open(&config.index_dir).await?);
            let provider = build_provider(&config).await?;

            let reconciler = Reconciler::new(config, index, provider)?;
            let report = reconciler.run().await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                OutputFormat::Summary => {
                    println!(
                        "Sync complete: {} added, {} deleted, {} failed",
                        report.added.len(),
                        report.deleted.len(),
                        report.failed.len()
                    );
                    for source in &report.added {
                        println!("  + {source}");
                    }
                    for source in &report.deleted {
                        println!("  - {source}");
                    }
                    for failure in &report.failed {
                        println!("  ! {}: {}", failure.source_id, failure.error);
                    }
                }
            }
            Ok(())
        }
        Commands::Ask {
            question,
            k,
            answer_url,
            answer_model,
        } => {
            let index = Arc::new(SqliteVectorIndex::open(&config.index_dir).await?);
            let provider = build_provider(&config).await?;

            let mut retrieval = config.retrieval.clone();
            if let Some(k) = k {
                retrieval.k = k;
            }
            let retriever = Retriever::new(index, provider, retrieval);

            let mut generator = ChatAnswerGenerator::new(answer_url, answer_model);
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                generator = generator.with_api_key(key);
            }

            let answer = retriever.ask(&generator, &question).await?;
            println!("{answer}");
            Ok(())
        }
        Commands::List {
            source,
            limit,
            format,
        } => {
            let index = SqliteVectorIndex::open(&config.index_dir).await?;
            let records = index.list_records(source.as_deref(), limit).await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} entries:", records.len());
                    for record in records {
                        println!(
                            "  ID: {} | Source: {} | Page: {} | Seq: {}",
                            record.id, record.source_id, record.page, record.sequence
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Stats { format } => {
            let index = SqliteVectorIndex::open(&config.index_dir).await?;
            let stats = index.stats().await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                OutputFormat::Summary => {
                    println!("Index statistics:");
                    println!("  Entries: {}", stats.entries);
                    println!("  Sources: {}", stats.sources);
                    match stats.model {
                        Some(model) => {
                            println!("  Model: {} ({}d)", model.name, model.dimension);
                        }
                        None => println!("  Model: none registered"),
                    }
                }
            }
            Ok(())
        }
    }
}
