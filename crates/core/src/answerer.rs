use crate::embeddings::embed_query;
use crate::error::QueryError;
use crate::models::{Answer, AnswerRoute, Document};
use crate::vectorindex::{EmbeddingIndex, DEFAULT_K};
use providers::{EmbeddingProvider, LlmProvider, ProviderError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const CONFIDENCE_PER_SOURCE: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct AnswererSettings {
    pub k: usize,
    pub timeout: Duration,
}

impl Default for AnswererSettings {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Retrieve-then-generate over the vector index.
#[derive(Clone)]
pub struct RetrievalAnswerer {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    settings: AnswererSettings,
}

impl RetrievalAnswerer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        settings: AnswererSettings,
    ) -> Self {
        Self {
            embedder,
            llm,
            settings,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    pub async fn answer(
        &self,
        index: &dyn EmbeddingIndex,
        question: &str,
        include_sources: bool,
    ) -> Result<Answer, QueryError> {
        if question.trim().is_empty() {
            return Err(QueryError::InvalidInput("question is empty".into()));
        }

        let embedding = embed_query(self.embedder.as_ref(), question, self.settings.timeout)
            .await
            .map_err(QueryError::EmbeddingFailure)?;
        let hits = index.search(&embedding, self.settings.k.max(1));
        let sources: Vec<Document> = hits.into_iter().map(|h| h.document).collect();
        debug!(retrieved = sources.len(), "retrieved context");

        let prompt = build_prompt(&sources, question);
        let generated = tokio::time::timeout(self.settings.timeout, self.llm.generate(&prompt))
            .await
            .map_err(|_| QueryError::GenerationFailure(ProviderError::Timeout(self.settings.timeout)))?
            .map_err(QueryError::GenerationFailure)?;

        let confidence = if include_sources && !sources.is_empty() {
            Some(confidence_for(sources.len()))
        } else {
            None
        };
        Ok(Answer {
            text: generated.text,
            sources: include_sources.then_some(sources),
            confidence,
            route: AnswerRoute::Retrieval,
        })
    }
}

pub fn confidence_for(source_count: usize) -> f32 {
    (CONFIDENCE_PER_SOURCE * source_count as f32).min(1.0)
}

/// Context documents first, then the question.
pub fn build_prompt(sources: &[Document], question: &str) -> String {
    let context = sources
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
         {context}\n\nQuestion: {question}\nHelpful Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_scales_and_caps() {
        assert!((confidence_for(1) - 0.3).abs() < 1e-6);
        assert!((confidence_for(3) - 0.9).abs() < 1e-6);
        assert_eq!(confidence_for(4), 1.0);
    }

    #[test]
    fn prompt_carries_context_and_question() {
        let docs = vec![
            Document::new("Name: Alice", 0),
            Document::new("Name: Bob", 1),
        ];
        let prompt = build_prompt(&docs, "Who is Bob?");
        assert!(prompt.contains("Name: Alice\n\nName: Bob"));
        assert!(prompt.ends_with("Question: Who is Bob?\nHelpful Answer:"));
    }
}
