use crate::{EmbedResponse, EmbeddingProvider, GenerateResponse, LlmProvider, ProviderError};

#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for NoopProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        Ok(EmbedResponse {
            vectors: vec![vec![]; texts.len()],
        })
    }

    fn model(&self) -> &str {
        "noop"
    }
}

#[async_trait::async_trait]
impl LlmProvider for NoopProvider {
    async fn generate(&self, _prompt: &str) -> Result<GenerateResponse, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}
