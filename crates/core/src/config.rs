use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub index: IndexConfig,
    pub embeddings: EmbeddingConfig,
    pub llm: LlmConfig,
    pub ollama: OllamaSettings,
    pub rag: RagConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub table_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            table_path: "data/employees.xlsx".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub path: String,
    pub batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: "index/roster.db".into(),
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    /// Also the tag stored with a persisted index.
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            model: "phi3".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            model: "phi3".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub k: usize,
    pub max_question_chars: usize,
    pub request_timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            k: 4,
            max_question_chars: 2000,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.rag.request_timeout_secs.max(1))
    }

    /// Problems worth reporting; none of them stop the service from starting.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !Path::new(&self.data.table_path).is_file() {
            problems.push(format!("employee table not found: {}", self.data.table_path));
        }
        if !Path::new(&self.index.path).is_file() {
            problems.push(format!(
                "vector index not found: {} (run build-index)",
                self.index.path
            ));
        }
        if self.rag.k == 0 {
            problems.push("rag.k must be at least 1".into());
        }
        if self.index.batch_size == 0 {
            problems.push("index.batch_size must be at least 1".into());
        }
        if self.rag.max_question_chars == 0 {
            problems.push("rag.max_question_chars must be at least 1".into());
        }
        problems
    }
}

/// File first (explicit path, else optional `config/default`), then `ROSTER__*` overrides.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("ROSTER")
            .prefix_separator("__")
            .separator("__"),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
