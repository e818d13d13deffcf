//! Local Ollama server: `/api/embed`, `/api/generate` and `/api/tags`.

use crate::{EmbedResponse, EmbeddingProvider, GenerateResponse, LlmProvider, ProviderError};
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct OllamaConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct OllamaProvider {
    client: Client,
    cfg: Arc<OllamaConfig>,
}

impl OllamaProvider {
    pub fn new(cfg: OllamaConfig) -> Self {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            cfg: Arc::new(cfg),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, ProviderError> {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.cfg.timeout))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
            return Err(ProviderError::RequestFailed(format!(
                "status {} body {:?}",
                status, body
            )));
        }
        Ok(resp)
    }
}

#[derive(Deserialize)]
struct EmbedApiResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct GenerateApiResponse {
    response: String,
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        #[derive(Serialize)]
        struct EmbedRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        if texts.is_empty() {
            return Ok(EmbedResponse { vectors: vec![] });
        }
        debug!(count = texts.len(), model = %self.cfg.embedding_model, "ollama embed");
        let body = EmbedRequest {
            model: &self.cfg.embedding_model,
            input: texts,
        };
        let parsed: EmbedApiResponse = self
            .post("/api/embed", &body)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        if parsed.embeddings.len() != texts.len() {
            return Err(ProviderError::RequestFailed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(EmbedResponse {
            vectors: parsed.embeddings,
        })
    }

    fn model(&self) -> &str {
        &self.cfg.embedding_model
    }

    async fn health(&self) -> bool {
        tags_reachable(&self.client, &self.url("/api/tags")).await
    }
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<GenerateResponse, ProviderError> {
        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            stream: bool,
        }

        let body = GenerateRequest {
            model: &self.cfg.chat_model,
            prompt,
            stream: false,
        };
        let parsed: GenerateApiResponse = self
            .post("/api/generate", &body)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(GenerateResponse {
            text: parsed.response.trim().to_string(),
        })
    }

    async fn health(&self) -> bool {
        tags_reachable(&self.client, &self.url("/api/tags")).await
    }
}

async fn tags_reachable(client: &Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
