//! Error types for the `ragstore` crate.

use thiserror::Error;

/// Errors that can occur in storage and retrieval operations.
#[derive(Debug, Error)]
pub enum RagStorageError {
    /// A configuration validation error, raised before any I/O.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend initialization failed (unreachable store, collection creation failure).
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// An operation was invoked before the storage was initialized.
    ///
    /// Always avoidable: construct through [`RagStorage::create`](crate::RagStorage::create)
    /// or call [`StorageProvider::initialize`](crate::StorageProvider::initialize) first.
    #[error("storage is not initialized; initialize it before use")]
    NotReady,

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure, including the failing operation.
        message: String,
    },

    /// An error occurred during embedding generation.
    ///
    /// Raised for whole-batch failures and for an absent query vector.
    /// Per-chunk failures during ingestion are tolerated instead.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    Chunking(String),
}

/// A convenience result type for storage operations.
pub type Result<T> = std::result::Result<T, RagStorageError>;
