//! Embedding client for OpenAI-compatible embeddings APIs.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::EmbeddingsConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagStorageError, Result};

/// The default API base for the OpenAI embeddings endpoint.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// The default embedding model.
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// Uses `reqwest` to call `{api_base}/embeddings` directly. Any service
/// speaking the OpenAI embeddings wire format works by overriding the base
/// URL.
///
/// Response data carries an `index` per embedding; slots missing from the
/// response map to `None`, preserving the per-slot partial-failure contract
/// of [`EmbeddingProvider::embed_batch`].
///
/// # Example
///
/// ```rust,ignore
/// use ragstore::openai::OpenAiEmbeddingProvider;
///
/// let provider = OpenAiEmbeddingProvider::new()
///     .with_api_key("sk-...")
///     .with_model("text-embedding-3-large", 3072);
/// let embeddings = provider.embed_batch(&["hello world"]).await?;
/// ```
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddingProvider {
    /// Create a provider with the default base URL, model, and dimensions.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.into(),
            api_key: None,
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    /// Build a provider from an [`EmbeddingsConfig`] section.
    pub fn from_config(config: &EmbeddingsConfig) -> Self {
        let mut provider = Self::new().with_model(&config.model, config.dimensions);
        if let Some(base) = &config.api_base {
            provider = provider.with_api_base(base);
        }
        if let Some(key) = &config.api_key {
            provider = provider.with_api_key(key);
        }
        provider
    }

    /// Set the bearer token sent with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Point the client at a different OpenAI-compatible API base.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the model name and the dimensionality it produces.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.api_base.trim_end_matches('/'))
    }
}

impl Default for OpenAiEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Option<Vec<f32>>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "openai", batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body =
            EmbeddingRequest { model: &self.model, input: texts, dimensions: Some(self.dimensions) };

        let mut request = self.client.post(self.endpoint()).json(&request_body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = "openai", error = %e, "embedding request failed");
            RagStorageError::Embedding {
                provider: "openai".into(),
                message: format!("request failed: {e}"),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "openai", %status, "embeddings API error");
            return Err(RagStorageError::Embedding {
                provider: "openai".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "openai", error = %e, "failed to parse embeddings response");
            RagStorageError::Embedding {
                provider: "openai".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        let mut slots: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for datum in embedding_response.data {
            match slots.get_mut(datum.index) {
                Some(slot) => *slot = Some(datum.embedding),
                None => warn!(
                    provider = "openai",
                    index = datum.index,
                    "embeddings API returned an out-of-range index, dropping"
                ),
            }
        }

        Ok(slots)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}
