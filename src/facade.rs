//! The public storage facade.
//!
//! [`RagStorage`] validates configuration eagerly, owns the provider
//! lifecycle, and exposes a stable contract independent of backend choice.
//! Construction is two-phase: synchronous validation first (configuration
//! errors surface before any I/O), then an asynchronous initialization step
//! whose failures are [`Initialization`](crate::RagStorageError::Initialization)
//! errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragstore::{CollectionConfig, EmbeddingsConfig, QdrantConfig, RagStorage, RagStorageConfig};
//!
//! let config = RagStorageConfig::builder()
//!     .collection(CollectionConfig::new("docs", 1536))
//!     .qdrant(QdrantConfig::new("http://localhost:6334"))
//!     .embeddings(EmbeddingsConfig::new("text-embedding-3-small", 1536))
//!     .build()?;
//!
//! let storage = RagStorage::create(config).await?;
//! let ids = storage.add_document("some text", None).await?;
//! let chunks = storage.retrieve_context("a question", Default::default()).await?;
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::{ChunkingConfig, RagStorageConfig};
use crate::document::{Document, Metadata, MetadataFilter, RetrievalOptions, RetrievedChunk, StoredPoint};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagStorageError, Result};
use crate::provider::StorageProvider;
use crate::vectorstore::VectorStore;

/// The document storage and retrieval facade.
///
/// Construct one via [`RagStorage::create`] or, when injecting custom
/// capabilities, via [`RagStorage::builder`]. A constructed facade is always
/// ready: the factory does not return until the provider is initialized.
pub struct RagStorage {
    config: RagStorageConfig,
    provider: StorageProvider,
}

impl RagStorage {
    /// Create a new [`RagStorageBuilder`].
    pub fn builder() -> RagStorageBuilder {
        RagStorageBuilder::default()
    }

    /// Asynchronous factory: validate the configuration, construct the
    /// embedding client and backend store, and initialize the provider.
    ///
    /// # Errors
    ///
    /// [`RagStorageError::Config`] for invalid configuration (raised before
    /// any I/O); [`RagStorageError::Initialization`] when the backend is
    /// unreachable or collection creation fails.
    pub async fn create(config: RagStorageConfig) -> Result<Self> {
        Self::builder().config(config).create().await
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagStorageConfig {
        &self.config
    }

    /// Ingest a document and return the ids of the points actually stored.
    ///
    /// Best-effort per chunk: chunks whose embeddings fail individually are
    /// skipped. An empty id list means either the content produced no chunks
    /// or every chunk failed to embed.
    pub async fn add_document(
        &self,
        content: impl Into<String>,
        metadata: Option<Metadata>,
    ) -> Result<Vec<String>> {
        let document = Document { content: content.into(), metadata };
        if self.config.debug {
            debug!(content_len = document.content.len(), "add_document");
        }
        self.provider.add_document(&document).await
    }

    /// Retrieve the chunks most similar to a query, ranked by descending
    /// score.
    ///
    /// Per-call options are merged over the configured defaults; the stored
    /// configuration is never mutated.
    pub async fn retrieve_context(
        &self,
        query: &str,
        options: RetrievalOptions,
    ) -> Result<Vec<RetrievedChunk>> {
        let limit = options.limit.unwrap_or(self.config.default_retrieval_limit);
        let score_threshold = options.score_threshold.or(self.config.default_score_threshold);
        if self.config.debug {
            debug!(limit, ?score_threshold, "retrieve_context");
        }
        self.provider.retrieve_context(query, limit, score_threshold, options.filter.as_ref()).await
    }

    /// Fetch all points matching a flat equality filter, including vectors.
    pub async fn get_documents_by_metadata(
        &self,
        filter: &MetadataFilter,
    ) -> Result<Vec<StoredPoint>> {
        self.provider.get_documents_by_metadata(filter).await
    }

    /// Delete points by id. No-op with a warning on an empty list.
    pub async fn delete_documents_by_ids(&self, ids: &[String]) -> Result<()> {
        self.provider.delete_documents_by_ids(ids).await
    }

    /// Delete all points matching a flat equality filter. No-op with a
    /// warning on an empty filter.
    pub async fn delete_documents_by_metadata(&self, filter: &MetadataFilter) -> Result<()> {
        self.provider.delete_documents_by_metadata(filter).await
    }

    /// Drop the entire collection. Idempotent: an absent collection is a
    /// successful no-op.
    pub async fn delete_storage(&self) -> Result<()> {
        self.provider.delete_storage().await
    }
}

/// Builder for constructing a [`RagStorage`].
///
/// Components left unset are constructed from the configuration: the chunker
/// from the chunking section (fixed-window defaults when absent), the
/// embedding client from the embeddings section, the vector store from the
/// backend section. An injected component lifts the requirement for its
/// config section.
///
/// # Example
///
/// ```rust,ignore
/// let storage = RagStorage::builder()
///     .config(config)
///     .vector_store(Arc::new(InMemoryVectorStore::new()))
///     .embedding_provider(Arc::new(my_embedder))
///     .create()
///     .await?;
/// ```
#[derive(Default)]
pub struct RagStorageBuilder {
    config: Option<RagStorageConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagStorageBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagStorageConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Inject an embedding provider instead of building one from the
    /// embeddings config section.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Inject a vector store instead of building one from the backend config
    /// section.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Substitute a custom chunking strategy.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Synchronous phase: validate configuration without touching the
    /// network.
    fn validate(&self) -> Result<()> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| RagStorageError::Config("config is required".to_string()))?;
        config.validate()?;
        if self.vector_store.is_none() {
            config.require_backend()?;
        }
        if self.embedding_provider.is_none() {
            config.require_embeddings()?;
        }
        Ok(())
    }

    /// Build the facade and initialize its provider.
    ///
    /// # Errors
    ///
    /// [`RagStorageError::Config`] before any I/O for invalid configuration;
    /// [`RagStorageError::Initialization`] for client construction and
    /// collection preparation failures.
    pub async fn create(self) -> Result<RagStorage> {
        self.validate()?;
        // Validation guarantees the config is present and complete.
        let config = match self.config {
            Some(config) => config,
            None => return Err(RagStorageError::Config("config is required".to_string())),
        };

        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => {
                let params = config.chunking.clone().unwrap_or_else(ChunkingConfig::default);
                Arc::new(FixedSizeChunker::new(params.chunk_size, params.chunk_overlap))
            }
        };

        let embedder = match self.embedding_provider {
            Some(embedder) => embedder,
            None => default_embedder(&config)?,
        };

        let store = match self.vector_store {
            Some(store) => store,
            None => default_store(&config)?,
        };

        let provider = StorageProvider::new(
            chunker,
            embedder,
            store,
            config.collection.name.clone(),
            config.collection.vector_size,
            config.collection.distance_metric,
        );
        provider.initialize().await?;

        if config.debug {
            debug!(collection = %config.collection.name, "storage facade ready");
        }
        Ok(RagStorage { config, provider })
    }
}

#[cfg(feature = "openai")]
fn default_embedder(config: &RagStorageConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embeddings = config.embeddings.as_ref().ok_or_else(|| {
        RagStorageError::Config("embeddings configuration is required".to_string())
    })?;
    Ok(Arc::new(crate::openai::OpenAiEmbeddingProvider::from_config(embeddings)))
}

#[cfg(not(feature = "openai"))]
fn default_embedder(_config: &RagStorageConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(RagStorageError::Config(
        "no embedding provider injected and the 'openai' feature is disabled".to_string(),
    ))
}

#[cfg(feature = "qdrant")]
fn default_store(config: &RagStorageConfig) -> Result<Arc<dyn VectorStore>> {
    let qdrant = config
        .qdrant
        .as_ref()
        .ok_or_else(|| RagStorageError::Config("qdrant configuration is required".to_string()))?;
    let store = crate::qdrant::QdrantVectorStore::from_config(qdrant)
        .map_err(|e| RagStorageError::Initialization(format!("failed to construct qdrant client: {e}")))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "qdrant"))]
fn default_store(_config: &RagStorageConfig) -> Result<Arc<dyn VectorStore>> {
    Err(RagStorageError::Config(
        "no vector store injected and the 'qdrant' feature is disabled".to_string(),
    ))
}
