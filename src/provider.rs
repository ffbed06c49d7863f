//! Storage provider: the ingestion and retrieval orchestrator.
//!
//! [`StorageProvider`] composes a [`Chunker`], an [`EmbeddingProvider`], and
//! a [`VectorStore`] to implement the chunk → embed → upsert ingestion path,
//! the embed → search retrieval path, and the metadata-filtered bulk
//! operations against one collection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::chunking::Chunker;
use crate::document::{
    CHUNK_INDEX_KEY, CONTENT_KEY, Document, MetadataFilter, RetrievedChunk, StoredPoint,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagStorageError, Result};
use crate::vectorstore::{DistanceMetric, VectorStore};

/// Page size for the scroll loop in [`StorageProvider::get_documents_by_metadata`].
pub const SCROLL_PAGE_SIZE: usize = 100;

const STATE_UNINITIALIZED: u8 = 0;
const STATE_INITIALIZING: u8 = 1;
const STATE_READY: u8 = 2;

/// The ingestion and retrieval orchestrator for one collection.
///
/// Moves through `Uninitialized → Initializing → Ready` exactly once; every
/// operation other than [`initialize`](Self::initialize) requires the `Ready`
/// state. The provider holds no local cache of points; the collection in the
/// backing store is the only shared mutable state.
pub struct StorageProvider {
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection_name: String,
    vector_size: u64,
    distance: DistanceMetric,
    state: AtomicU8,
}

impl StorageProvider {
    /// Create an uninitialized provider over the given capabilities.
    pub fn new(
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        collection_name: impl Into<String>,
        vector_size: u64,
        distance: DistanceMetric,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            collection_name: collection_name.into(),
            vector_size,
            distance,
            state: AtomicU8::new(STATE_UNINITIALIZED),
        }
    }

    /// The name of the collection this provider operates on.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Prepare the provider for use, creating the collection if absent.
    ///
    /// An already-existing collection is trusted as-is; its vector size and
    /// distance metric are not verified against the configured values.
    /// Idempotent: calling on a `Ready` provider logs and returns.
    ///
    /// # Errors
    ///
    /// Returns [`RagStorageError::Initialization`] if the backend is
    /// unreachable or collection creation fails; the provider then stays
    /// uninitialized.
    pub async fn initialize(&self) -> Result<()> {
        if self.state.load(Ordering::Acquire) == STATE_READY {
            debug!(collection = %self.collection_name, "provider already initialized");
            return Ok(());
        }

        self.state.store(STATE_INITIALIZING, Ordering::Release);
        match self
            .store
            .ensure_collection(&self.collection_name, self.vector_size, self.distance)
            .await
        {
            Ok(()) => {
                self.state.store(STATE_READY, Ordering::Release);
                info!(collection = %self.collection_name, "storage provider initialized");
                Ok(())
            }
            Err(e) => {
                self.state.store(STATE_UNINITIALIZED, Ordering::Release);
                error!(collection = %self.collection_name, error = %e, "initialization failed");
                Err(RagStorageError::Initialization(format!(
                    "failed to prepare collection '{}': {e}",
                    self.collection_name
                )))
            }
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state.load(Ordering::Acquire) == STATE_READY {
            Ok(())
        } else {
            Err(RagStorageError::NotReady)
        }
    }

    /// Ingest a document: chunk → batch embed → upsert.
    ///
    /// Ingestion is best-effort per chunk: a chunk whose embedding slot comes
    /// back absent is skipped with a warning rather than aborting the
    /// document. Returns the ids of the points actually upserted, in chunk
    /// order. Content yielding no chunks, or a batch where every slot failed,
    /// returns an empty list without contacting the store.
    ///
    /// # Errors
    ///
    /// A failure of the embedding batch call as a whole, or of the upsert,
    /// is fatal for the call and propagated.
    pub async fn add_document(&self, document: &Document) -> Result<Vec<String>> {
        self.ensure_ready()?;

        let chunks = self.chunker.split(&document.content);
        if chunks.is_empty() {
            warn!(collection = %self.collection_name, "document produced no chunks, nothing to ingest");
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
            error!(error = %e, "embedding batch failed during ingestion");
            e
        })?;

        let chunk_count = chunks.len();
        let mut points = Vec::with_capacity(chunk_count);
        let mut ids = Vec::with_capacity(chunk_count);
        for (index, (chunk, embedding)) in chunks.into_iter().zip(embeddings).enumerate() {
            let Some(vector) = embedding else {
                warn!(chunk_index = index, "no embedding returned for chunk, skipping");
                continue;
            };

            let id = Uuid::new_v4().to_string();
            let mut payload = document.metadata.clone().unwrap_or_default();
            payload.insert(CONTENT_KEY.to_string(), Value::String(chunk));
            payload.insert(CHUNK_INDEX_KEY.to_string(), Value::from(index));
            points.push(StoredPoint { id: id.clone(), vector, payload });
            ids.push(id);
        }

        if points.is_empty() {
            warn!(collection = %self.collection_name, chunk_count, "every chunk failed to embed, nothing to upsert");
            return Ok(Vec::new());
        }

        self.store.upsert(&self.collection_name, points).await.map_err(|e| {
            error!(collection = %self.collection_name, error = %e, "upsert failed during ingestion");
            e
        })?;

        info!(
            collection = %self.collection_name,
            stored = ids.len(),
            chunk_count,
            "ingested document"
        );
        Ok(ids)
    }

    /// Retrieve the chunks most similar to a query text.
    ///
    /// Results arrive in the backend's descending-score order; no local
    /// re-sorting or thresholding is applied. Payloads missing a content
    /// field map to an empty content string rather than failing.
    ///
    /// # Errors
    ///
    /// Fails fast with [`RagStorageError::Embedding`] when no query vector
    /// can be produced — there is nothing to search with.
    pub async fn retrieve_context(
        &self,
        query: &str,
        limit: usize,
        score_threshold: Option<f32>,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievedChunk>> {
        self.ensure_ready()?;

        let embeddings = self.embedder.embed_batch(&[query]).await.map_err(|e| {
            error!(error = %e, "query embedding failed");
            e
        })?;
        let vector = embeddings.into_iter().next().flatten().ok_or_else(|| {
            RagStorageError::Embedding {
                provider: self.embedder.name().to_string(),
                message: "no embedding returned for the query text".to_string(),
            }
        })?;

        let hits = self
            .store
            .search(&self.collection_name, &vector, limit, score_threshold, filter)
            .await
            .map_err(|e| {
                error!(collection = %self.collection_name, error = %e, "similarity search failed");
                e
            })?;

        let chunks: Vec<RetrievedChunk> = hits
            .into_iter()
            .map(|hit| {
                let mut payload = hit.payload;
                let content = match payload.remove(CONTENT_KEY) {
                    Some(Value::String(content)) => content,
                    // Tolerate malformed legacy payloads.
                    _ => String::new(),
                };
                let metadata = if payload.is_empty() { None } else { Some(payload) };
                RetrievedChunk { content, score: hit.score, metadata }
            })
            .collect();

        info!(collection = %self.collection_name, count = chunks.len(), "retrieved context");
        Ok(chunks)
    }

    /// Fetch all points whose payload matches the filter, following the
    /// backend's scroll cursor until exhaustion.
    ///
    /// Returns full points including vectors; this is the administrative
    /// path, not the hot retrieval path.
    pub async fn get_documents_by_metadata(
        &self,
        filter: &MetadataFilter,
    ) -> Result<Vec<StoredPoint>> {
        self.ensure_ready()?;

        let mut points = Vec::new();
        let mut offset = None;
        loop {
            let page = self
                .store
                .scroll(&self.collection_name, filter, SCROLL_PAGE_SIZE, offset)
                .await
                .map_err(|e| {
                    error!(collection = %self.collection_name, error = %e, "scroll failed");
                    e
                })?;
            points.extend(page.points);
            match page.next_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        info!(collection = %self.collection_name, count = points.len(), "fetched points by metadata");
        Ok(points)
    }

    /// Delete points by id, waiting for acknowledgement.
    ///
    /// An empty id list is a no-op with a warning.
    pub async fn delete_documents_by_ids(&self, ids: &[String]) -> Result<()> {
        self.ensure_ready()?;

        if ids.is_empty() {
            warn!(collection = %self.collection_name, "delete called with no ids, nothing to do");
            return Ok(());
        }

        self.store.delete_by_ids(&self.collection_name, ids).await.map_err(|e| {
            error!(collection = %self.collection_name, error = %e, "delete by ids failed");
            e
        })?;

        info!(collection = %self.collection_name, count = ids.len(), "deleted points by id");
        Ok(())
    }

    /// Delete all points whose payload matches the filter.
    ///
    /// An empty filter is a no-op with a warning. Success means the delete
    /// request was accepted; the backend reports no affected-row count.
    pub async fn delete_documents_by_metadata(&self, filter: &MetadataFilter) -> Result<()> {
        self.ensure_ready()?;

        if filter.is_empty() {
            warn!(collection = %self.collection_name, "delete called with an empty filter, nothing to do");
            return Ok(());
        }

        self.store.delete_by_filter(&self.collection_name, filter).await.map_err(|e| {
            error!(collection = %self.collection_name, error = %e, "delete by filter failed");
            e
        })?;

        info!(collection = %self.collection_name, "deleted points by filter");
        Ok(())
    }

    /// Drop the entire collection.
    ///
    /// Idempotent teardown: an absent collection is a successful no-op.
    pub async fn delete_storage(&self) -> Result<()> {
        self.ensure_ready()?;

        self.store.delete_collection(&self.collection_name).await.map_err(|e| {
            error!(collection = %self.collection_name, error = %e, "collection teardown failed");
            e
        })?;

        info!(collection = %self.collection_name, "deleted collection");
        Ok(())
    }
}
