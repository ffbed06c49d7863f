//! Data types for documents, stored points, and retrieval results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat key-value metadata attached to documents and payloads.
pub type Metadata = HashMap<String, Value>;

/// A flat equality filter over payload fields.
///
/// Backends translate every `(field, value)` pair into a field-equals-value
/// condition and combine them conjunctively (AND).
pub type MetadataFilter = HashMap<String, Value>;

/// Payload key holding the chunk text.
pub const CONTENT_KEY: &str = "content";

/// Payload key holding the chunk's index within its source document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// A source document to ingest.
///
/// Transient: a document is never persisted as a unit, only the points
/// derived from its chunks are.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The raw text content.
    pub content: String,
    /// Caller-supplied metadata, merged flat into every derived point's payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), metadata: None }
    }

    /// Attach metadata to the document.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// The persisted unit in a vector store collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredPoint {
    /// Opaque unique identifier, generated fresh at ingestion time.
    pub id: String,
    /// The embedding vector; its length matches the collection's vector size.
    pub vector: Vec<f32>,
    /// Chunk content, chunk index, and caller metadata, merged flat.
    pub payload: Metadata,
}

/// A similarity search hit: point id, score, and payload (no vector).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    /// The id of the matching point.
    pub id: String,
    /// The similarity score (higher is more relevant).
    pub score: f32,
    /// The point's payload.
    pub payload: Metadata,
}

/// A chunk returned from [`retrieve_context`](crate::RagStorage::retrieve_context).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// The chunk text.
    pub content: String,
    /// The similarity score (higher is more relevant).
    pub score: f32,
    /// Remaining payload fields with the content field removed.
    ///
    /// `None` rather than an empty map when nothing remains, so callers can
    /// distinguish "no metadata" with a plain `is_some` check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Per-call retrieval options, merged over the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOptions {
    /// Maximum number of chunks to return. Defaults to the configured limit.
    pub limit: Option<usize>,
    /// Exclude results scoring below this threshold (applied by the backend).
    pub score_threshold: Option<f32>,
    /// Restrict the search to points matching this filter.
    pub filter: Option<MetadataFilter>,
}

impl RetrievalOptions {
    /// Override the result limit for this call.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Override the score threshold for this call.
    pub fn score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    /// Restrict the search to points matching the filter.
    pub fn filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// One page of a cursor-based scan.
#[derive(Debug, Clone)]
pub struct ScrollPage {
    /// Points in this page, including vectors.
    pub points: Vec<StoredPoint>,
    /// Cursor for the next page; `None` when the scan is exhausted.
    pub next_offset: Option<String>,
}
