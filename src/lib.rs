//! Document ingestion and semantic retrieval over a vector store backend.
//!
//! `ragstore` ingests free-text documents by chunking them, embedding each
//! chunk, and persisting the results as points in a vector database; later
//! it retrieves the chunks most semantically similar to a query. Metadata
//! filters drive the administrative surface: paginated scans, targeted
//! deletes, and collection teardown.
//!
//! The crate is organized around three injected capabilities — a
//! [`Chunker`], an [`EmbeddingProvider`], and a [`VectorStore`] — composed
//! by a [`StorageProvider`] and fronted by the [`RagStorage`] facade.
//! Production deployments use the [Qdrant](https://qdrant.tech/) backend
//! (feature `qdrant`, on by default) and an OpenAI-compatible embeddings
//! client (feature `openai`, on by default); tests and development use
//! [`InMemoryVectorStore`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ragstore::{CollectionConfig, EmbeddingsConfig, QdrantConfig, RagStorage,
//!     RagStorageConfig, RetrievalOptions};
//!
//! let config = RagStorageConfig::builder()
//!     .collection(CollectionConfig::new("docs", 1536))
//!     .qdrant(QdrantConfig::new("http://localhost:6334"))
//!     .embeddings(EmbeddingsConfig::new("text-embedding-3-small", 1536))
//!     .build()?;
//!
//! let storage = RagStorage::create(config).await?;
//! storage.add_document("UBC is a public research university.", None).await?;
//! let chunks = storage
//!     .retrieve_context("Tell me about UBC", RetrievalOptions::default().limit(1))
//!     .await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod facade;
pub mod inmemory;
#[cfg(feature = "openai")]
pub mod openai;
pub mod provider;
#[cfg(feature = "qdrant")]
pub mod qdrant;
pub mod vectorstore;

pub use chunking::{Chunker, ChunkerFn, FixedSizeChunker};
pub use config::{
    ChunkingConfig, CollectionConfig, EmbeddingsConfig, QdrantConfig, RagStorageConfig,
    RagStorageConfigBuilder, VectorStoreProvider,
};
pub use document::{
    Document, Metadata, MetadataFilter, RetrievalOptions, RetrievedChunk, ScoredPoint,
    ScrollPage, StoredPoint,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagStorageError, Result};
pub use facade::{RagStorage, RagStorageBuilder};
pub use inmemory::InMemoryVectorStore;
#[cfg(feature = "openai")]
pub use openai::OpenAiEmbeddingProvider;
pub use provider::StorageProvider;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
pub use vectorstore::{DistanceMetric, VectorStore};
