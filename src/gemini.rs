//! Gemini summaries and embeddings through edgequake-llm.
//!
//! Wraps [`GeminiProvider`] as both a [`TextGenerator`] and an [`Embedder`].
//! A missing key is not an error at construction time; each call fails with
//! [`GenerationError::MissingApiKey`] instead, which the pipeline records
//! against the affected table.

use crate::config::ExtractorConfig;
use crate::embedding::Embedder;
use crate::error::GenerationError;
use crate::pipeline::summarize::{chat_completion, GenerationOptions, TextGenerator};
use async_trait::async_trait;
use edgequake_llm::{EmbeddingProvider, GeminiProvider};
use std::sync::Arc;
use tracing::debug;

/// Gemini-backed [`TextGenerator`] and [`Embedder`].
#[derive(Clone)]
pub struct GeminiClient {
    provider: Option<Arc<GeminiProvider>>,
    model: String,
    embedding_model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &self.provider.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl GeminiClient {
    /// `embedding_dimension` is requested from the API when it differs from
    /// the model's native size.
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        embedding_model: impl Into<String>,
        embedding_dimension: usize,
    ) -> Self {
        let model = model.into();
        let embedding_model = embedding_model.into();
        let provider = api_key.filter(|k| !k.trim().is_empty()).map(|key| {
            Arc::new(
                GeminiProvider::new(key)
                    .with_model(model.clone())
                    .with_embedding_model(embedding_model.clone())
                    .with_embedding_dimension(embedding_dimension),
            )
        });
        Self {
            provider,
            model,
            embedding_model,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )
    }

    pub fn has_api_key(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> Result<&GeminiProvider, GenerationError> {
        self.provider
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let provider = self.provider()?;
        debug!("Gemini {}: {} char prompt", self.model, prompt.len());
        chat_completion(provider, prompt, options).await
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GenerationError> {
        let provider = self.provider()?;
        Ok(EmbeddingProvider::embed_one(provider, text).await?)
    }
}
