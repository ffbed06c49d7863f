//! Configuration for the storage facade.

use serde::{Deserialize, Serialize};

use crate::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{RagStorageError, Result};
use crate::vectorstore::DistanceMetric;

/// Default number of chunks returned by a retrieval call.
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 5;

/// Vector store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Qdrant over gRPC.
    #[default]
    Qdrant,
}

/// Schema of the collection the facade operates on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionConfig {
    /// Collection name.
    pub name: String,
    /// Fixed vector length for every point in the collection.
    pub vector_size: u64,
    /// Distance metric used for similarity search.
    #[serde(default)]
    pub distance_metric: DistanceMetric,
}

impl CollectionConfig {
    /// Create a collection config with the default (cosine) distance metric.
    pub fn new(name: impl Into<String>, vector_size: u64) -> Self {
        Self { name: name.into(), vector_size, distance_metric: DistanceMetric::default() }
    }
}

/// Connection parameters for the Qdrant backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QdrantConfig {
    /// gRPC endpoint, e.g. `http://localhost:6334`.
    pub url: String,
    /// Optional API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl QdrantConfig {
    /// Create a config for an unauthenticated endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), api_key: None }
    }

    /// Attach an API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Configuration for the embeddings client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingsConfig {
    /// Base URL of an OpenAI-compatible API; the default OpenAI endpoint
    /// when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Optional bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Embedding model name.
    pub model: String,
    /// Dimensionality the model produces. Should match the collection's
    /// vector size; this is not verified here (the backend rejects
    /// mismatched vectors at upsert).
    pub dimensions: usize,
}

impl EmbeddingsConfig {
    /// Create an embeddings config for the given model and dimensionality.
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self { api_base: None, api_key: None, model: model.into(), dimensions }
    }
}

/// Parameters for the default fixed-window chunker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

/// Configuration for [`RagStorage`](crate::RagStorage).
///
/// Immutable after facade construction: per-call options are merged over
/// these defaults without mutating the stored configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagStorageConfig {
    /// Vector store backend selector.
    #[serde(default)]
    pub provider: VectorStoreProvider,
    /// Collection schema; required.
    pub collection: CollectionConfig,
    /// Qdrant connection parameters; required unless a vector store instance
    /// is injected through the builder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qdrant: Option<QdrantConfig>,
    /// Embeddings client parameters; required unless an embedding provider
    /// instance is injected through the builder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<EmbeddingsConfig>,
    /// Fixed-window chunker parameters; the 512/100 defaults when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunking: Option<ChunkingConfig>,
    /// Default number of chunks returned by a retrieval call.
    pub default_retrieval_limit: usize,
    /// Default score threshold applied to retrieval calls; none when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_score_threshold: Option<f32>,
    /// Verbose per-operation logging toggle.
    #[serde(default)]
    pub debug: bool,
}

impl RagStorageConfig {
    /// Create a config with the given collection schema and all defaults.
    pub fn new(collection: CollectionConfig) -> Self {
        Self {
            provider: VectorStoreProvider::default(),
            collection,
            qdrant: None,
            embeddings: None,
            chunking: None,
            default_retrieval_limit: DEFAULT_RETRIEVAL_LIMIT,
            default_score_threshold: None,
            debug: false,
        }
    }

    /// Create a new builder for constructing a [`RagStorageConfig`].
    pub fn builder() -> RagStorageConfigBuilder {
        RagStorageConfigBuilder::default()
    }

    /// Validate the fields that apply regardless of injected components.
    ///
    /// # Errors
    ///
    /// Returns [`RagStorageError::Config`] if:
    /// - the collection name is empty or its vector size is zero
    /// - `chunk_overlap >= chunk_size`
    /// - `default_retrieval_limit == 0`
    pub fn validate(&self) -> Result<()> {
        if self.collection.name.is_empty() {
            return Err(RagStorageError::Config("collection name must not be empty".to_string()));
        }
        if self.collection.vector_size == 0 {
            return Err(RagStorageError::Config(
                "collection vector_size must be greater than zero".to_string(),
            ));
        }
        if let Some(chunking) = &self.chunking {
            if chunking.chunk_size == 0 {
                return Err(RagStorageError::Config(
                    "chunk_size must be greater than zero".to_string(),
                ));
            }
            if chunking.chunk_overlap >= chunking.chunk_size {
                return Err(RagStorageError::Config(format!(
                    "chunk_overlap ({}) must be less than chunk_size ({})",
                    chunking.chunk_overlap, chunking.chunk_size
                )));
            }
        }
        if self.default_retrieval_limit == 0 {
            return Err(RagStorageError::Config(
                "default_retrieval_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate the backend section required when no vector store is injected.
    pub(crate) fn require_backend(&self) -> Result<()> {
        match self.provider {
            VectorStoreProvider::Qdrant => {
                let qdrant = self.qdrant.as_ref().ok_or_else(|| {
                    RagStorageError::Config(
                        "qdrant configuration is required for the qdrant provider".to_string(),
                    )
                })?;
                if qdrant.url.is_empty() {
                    return Err(RagStorageError::Config(
                        "qdrant url must not be empty".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Validate the embeddings section required when no embedding provider is injected.
    pub(crate) fn require_embeddings(&self) -> Result<()> {
        let embeddings = self.embeddings.as_ref().ok_or_else(|| {
            RagStorageError::Config("embeddings configuration is required".to_string())
        })?;
        if embeddings.model.is_empty() {
            return Err(RagStorageError::Config(
                "embeddings model must not be empty".to_string(),
            ));
        }
        if embeddings.dimensions == 0 {
            return Err(RagStorageError::Config(
                "embeddings dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagStorageConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagStorageConfigBuilder {
    provider: VectorStoreProvider,
    collection: Option<CollectionConfig>,
    qdrant: Option<QdrantConfig>,
    embeddings: Option<EmbeddingsConfig>,
    chunking: Option<ChunkingConfig>,
    default_retrieval_limit: Option<usize>,
    default_score_threshold: Option<f32>,
    debug: bool,
}

impl RagStorageConfigBuilder {
    /// Select the vector store backend.
    pub fn provider(mut self, provider: VectorStoreProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Set the collection schema.
    pub fn collection(mut self, collection: CollectionConfig) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Set the Qdrant connection parameters.
    pub fn qdrant(mut self, qdrant: QdrantConfig) -> Self {
        self.qdrant = Some(qdrant);
        self
    }

    /// Set the embeddings client parameters.
    pub fn embeddings(mut self, embeddings: EmbeddingsConfig) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Set the fixed-window chunker parameters.
    pub fn chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = Some(chunking);
        self
    }

    /// Set the default number of chunks returned by a retrieval call.
    pub fn default_retrieval_limit(mut self, limit: usize) -> Self {
        self.default_retrieval_limit = Some(limit);
        self
    }

    /// Set the default score threshold for retrieval calls.
    pub fn default_score_threshold(mut self, threshold: f32) -> Self {
        self.default_score_threshold = Some(threshold);
        self
    }

    /// Toggle verbose per-operation logging.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Build the [`RagStorageConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagStorageError::Config`] if the collection section is
    /// missing or any field fails [`RagStorageConfig::validate`].
    pub fn build(self) -> Result<RagStorageConfig> {
        let collection = self
            .collection
            .ok_or_else(|| RagStorageError::Config("collection is required".to_string()))?;

        let config = RagStorageConfig {
            provider: self.provider,
            collection,
            qdrant: self.qdrant,
            embeddings: self.embeddings,
            chunking: self.chunking,
            default_retrieval_limit: self.default_retrieval_limit.unwrap_or(DEFAULT_RETRIEVAL_LIMIT),
            default_score_threshold: self.default_score_threshold,
            debug: self.debug,
        };
        config.validate()?;
        Ok(config)
    }
}
