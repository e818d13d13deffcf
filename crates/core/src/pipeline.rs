use crate::answerer::{AnswererSettings, RetrievalAnswerer};
use crate::config::AppConfig;
use crate::documentizer::documentize;
use crate::query_engine::StructuredQueryEngine;
use crate::router::{QueryService, RouterSettings};
use crate::table::load_table;
use crate::vectorindex::{EmbeddingIndex, IndexError, VectorIndex};
use anyhow::Context;
use providers::noop::NoopProvider;
use providers::ollama::{OllamaConfig, OllamaProvider};
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::ProviderRegistry;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildSummary {
    pub rows: usize,
    pub documents: usize,
    pub dimension: usize,
    pub model: String,
    pub index_path: String,
}

pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let timeout = config.request_timeout();
    let mut reg = ProviderRegistry::new()
        .with_embedding("noop", Arc::new(NoopProvider))
        .with_llm("noop", Arc::new(NoopProvider));

    let ollama = OllamaProvider::new(OllamaConfig {
        base_url: config.ollama.base_url.clone(),
        embedding_model: config.embeddings.model.clone(),
        chat_model: config.llm.model.clone(),
        timeout,
    });
    reg = reg
        .with_embedding("ollama", Arc::new(ollama.clone()))
        .with_llm("ollama", Arc::new(ollama));

    if let (Some(key), Some(base)) = (
        std::env::var_os("OPENAI_API_KEY"),
        std::env::var_os("OPENAI_BASE_URL"),
    ) {
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url: base.to_string_lossy().into_owned(),
            embedding_model: config.embeddings.model.clone(),
            chat_model: config.llm.model.clone(),
            timeout,
        });
        reg = reg
            .with_embedding("openai", Arc::new(provider.clone()))
            .with_llm("openai", Arc::new(provider));
    }

    reg.set_preferred_embedding(&config.embeddings.provider)
        .set_preferred_llm(&config.llm.provider)
}

/// Table -> documents -> embeddings -> persisted index.
pub async fn build_index(
    config: &AppConfig,
    registry: &ProviderRegistry,
) -> anyhow::Result<BuildSummary> {
    let table_path = Path::new(&config.data.table_path);
    let table = load_table(table_path)
        .with_context(|| format!("load employee table {}", table_path.display()))?;
    let documents = documentize(&table);
    info!(rows = table.len(), documents = documents.len(), "documentized table");

    let embedder = registry.embedding(None).context("resolve embedding provider")?;
    let document_count = documents.len();
    let index = VectorIndex::build(
        documents,
        embedder.as_ref(),
        config.index.batch_size,
        config.request_timeout(),
    )
    .await
    .context("embed documents")?;

    let index_path = Path::new(&config.index.path);
    index.persist(index_path).await.context("persist index")?;

    Ok(BuildSummary {
        rows: table.len(),
        documents: document_count,
        dimension: index.dimension(),
        model: index.model().to_string(),
        index_path: config.index.path.clone(),
    })
}

/// Assembles a service from configuration. A missing table or index degrades
/// the service instead of failing startup.
pub async fn open_service(
    config: &AppConfig,
    registry: &ProviderRegistry,
) -> anyhow::Result<QueryService> {
    let engine = StructuredQueryEngine::load(Path::new(&config.data.table_path));
    if let Some(err) = engine.load_error() {
        warn!(error = %err, "employee table unavailable; structured lookups return nothing");
    }

    let embedder = registry.embedding(None).context("resolve embedding provider")?;
    let llm = registry.llm(None).context("resolve llm provider")?;

    let index: Option<Arc<dyn EmbeddingIndex>> =
        match VectorIndex::load(Path::new(&config.index.path), embedder.model()).await {
            Ok(index) => Some(Arc::new(index)),
            Err(err @ IndexError::ModelMismatch { .. }) => {
                warn!(error = %err, "refusing stale index; rebuild it with build-index");
                None
            }
            Err(err) => {
                warn!(error = %err, "vector index unavailable");
                None
            }
        };

    let answerer = RetrievalAnswerer::new(
        embedder,
        llm,
        AnswererSettings {
            k: config.rag.k.max(1),
            timeout: config.request_timeout(),
        },
    );
    Ok(QueryService::new(
        engine,
        index,
        answerer,
        RouterSettings {
            max_question_chars: config.rag.max_question_chars,
        },
    ))
}
