use providers::{EmbeddingProvider, ProviderError};
use std::time::Duration;

/// One vector per input text, in input order.
pub async fn embed_with(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    timeout: Duration,
) -> Result<Vec<Vec<f32>>, ProviderError> {
    let resp = tokio::time::timeout(timeout, provider.embed(texts))
        .await
        .map_err(|_| ProviderError::Timeout(timeout))??;
    if resp.vectors.len() != texts.len() {
        return Err(ProviderError::RequestFailed(format!(
            "provider returned {} vectors for {} texts",
            resp.vectors.len(),
            texts.len()
        )));
    }
    Ok(resp.vectors)
}

pub async fn embed_query(
    provider: &dyn EmbeddingProvider,
    text: &str,
    timeout: Duration,
) -> Result<Vec<f32>, ProviderError> {
    let mut vectors = embed_with(provider, &[text.to_string()], timeout).await?;
    Ok(vectors.pop().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::EmbedResponse;

    struct SlowProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for SlowProvider {
        async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(EmbedResponse {
                vectors: vec![vec![1.0]; texts.len()],
            })
        }

        fn model(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let err = embed_query(&SlowProvider, "hello", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    struct ShortProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ShortProvider {
        async fn embed(&self, _texts: &[String]) -> Result<EmbedResponse, ProviderError> {
            Ok(EmbedResponse {
                vectors: vec![vec![1.0]],
            })
        }

        fn model(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn vector_count_must_match_inputs() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = embed_with(&ShortProvider, &texts, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RequestFailed(_)));
    }
}
