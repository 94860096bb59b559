//! Composite CLI - model routing, retrieval and generation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use composite_ai::{CompositeConfig, CompositeModelService, ProviderTable, AUTO_MODEL};
use composite_core::{ConversationMessage, MessageRole, ModelContext};
use composite_knowledge::RagService;
use composite_quality::PostProcessor;
use composite_routing::{classify, ModelRegistry};
use composite_storage::{ConversationSource, JsonStorage};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Prior messages included in a generation request.
const HISTORY_LIMIT: usize = 20;

#[derive(Parser)]
#[command(name = "composite")]
#[command(about = "Composite model routing, retrieval and generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(long, global = true, default_value = "composite.json")]
    config: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered models
    Models,
    /// Recommend a model for a task
    Recommend {
        /// Task description
        task: String,
    },
    /// Classify a query
    Classify {
        /// Query text
        query: String,
    },
    /// Estimate processing time in milliseconds
    Estimate {
        /// Query text
        query: String,
        /// Model name
        #[arg(long)]
        model: Option<String>,
    },
    /// Load conversation history into the document store
    Index {
        /// Project scope
        #[arg(long)]
        project: Option<String>,
    },
    /// Generate a response
    Generate {
        /// User query
        query: String,
        /// Model name, or "auto"
        #[arg(long, default_value = AUTO_MODEL)]
        model: String,
        /// Project scope
        #[arg(long, default_value = "default")]
        project: String,
        /// Extra context, JSON or plain text
        #[arg(long)]
        context: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = CompositeConfig::load(&cli.config)?;
    let registry = Arc::new(ModelRegistry::new());

    match cli.command {
        Commands::Models => {
            let models = registry.models();
            println!("Models ({})", models.len());
            for model in models {
                println!(
                    "  {} | {} {} | {:?} | {}",
                    model.name,
                    model.base_model.provider,
                    model.base_model.model_id,
                    model.tier(),
                    model.capabilities.optimal_for_tasks.join(", "),
                );
            }
        }
        Commands::Recommend { task } => {
            println!("{}", registry.recommend_model(&task));
        }
        Commands::Classify { query } => {
            let classification = classify(&query);
            println!("{} ({})", classification.task_type, classification.complexity);
        }
        Commands::Estimate { query, model } => {
            let service = build_service(&config, registry, None);
            let model = model.unwrap_or_else(|| service.recommend_model(&query));
            if service.registry().get_model_config(&model).is_none() {
                anyhow::bail!("Unknown model: {}", model);
            }
            println!("{}", service.estimate_processing_time(&query, Some(&model)));
        }
        Commands::Index { project } => {
            let storage = open_storage(&config).await?;
            let service = build_service(&config, registry, Some(storage));
            service.rag().load_persisted().await;
            service.rag().load_documents(project.as_deref()).await;
            service.rag().flush().await;
            println!("{}", service.rag().document_count().await);
        }
        Commands::Generate {
            query,
            model,
            project,
            context,
        } => {
            let storage = open_storage(&config).await?;
            let history = storage
                .recent_messages(Some(&project), HISTORY_LIMIT)
                .await
                .context("Failed to load conversation history")?;
            let service = build_service(&config, registry, Some(storage.clone()));
            service.rag().load_persisted().await;

            let question = ConversationMessage::new(MessageRole::User, query.clone())
                .in_project(project.clone());
            let mut request = ModelContext::new(project.clone(), query).with_recent_messages(history);
            if let Some(extra) = context {
                let value = serde_json::from_str(&extra)
                    .unwrap_or(serde_json::Value::String(extra));
                request = request.with_additional_context(value);
            }

            let response = service.generate_response(&model, &request).await;
            service.rag().flush().await;
            let response = response?;

            let answer = ConversationMessage::new(MessageRole::Assistant, response.content.clone())
                .in_project(project);
            for message in [&question, &answer] {
                storage
                    .save_message(message)
                    .await
                    .context("Failed to record conversation")?;
            }

            info!(
                "Response from {} in {}ms",
                response.metadata.model_used, response.metadata.processing_time_ms
            );
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

async fn open_storage(config: &CompositeConfig) -> Result<Arc<JsonStorage>> {
    let storage = JsonStorage::new(&config.storage_path)
        .await
        .with_context(|| format!("Failed to open storage at {}", config.storage_path.display()))?;
    Ok(Arc::new(storage))
}

fn build_service(
    config: &CompositeConfig,
    registry: Arc<ModelRegistry>,
    storage: Option<Arc<JsonStorage>>,
) -> CompositeModelService {
    let mut rag = RagService::builder();
    if let Some(storage) = storage {
        rag = rag
            .conversation_source(storage.clone())
            .document_store(storage);
    }

    CompositeModelService::new(
        registry,
        Arc::new(rag.build()),
        Arc::new(PostProcessor::new()),
        ProviderTable::from_config(config),
    )
    .with_retrieval(config.retrieval.clone())
}
