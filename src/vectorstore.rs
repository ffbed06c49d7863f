//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{MetadataFilter, ScoredPoint, ScrollPage, StoredPoint};
use crate::error::Result;

/// Distance metric used for similarity search within a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Euclidean distance.
    Euclid,
    /// Dot product.
    Dot,
}

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections of [`StoredPoint`]s and support
/// upserting, deleting, searching by vector similarity, and cursor-based
/// scanning by metadata filter.
///
/// # Example
///
/// ```rust,ignore
/// use ragstore::{VectorStore, InMemoryVectorStore, DistanceMetric};
///
/// let store = InMemoryVectorStore::new();
/// store.ensure_collection("docs", 384, DistanceMetric::Cosine).await?;
/// store.upsert("docs", points).await?;
/// let hits = store.search("docs", &query_vector, 5, None, None).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection with the given schema. No-op if it already
    /// exists; an existing collection's schema is trusted as-is.
    async fn ensure_collection(
        &self,
        name: &str,
        vector_size: u64,
        distance: DistanceMetric,
    ) -> Result<()>;

    /// Delete a named collection and all its data.
    ///
    /// Deleting an absent collection is a successful no-op.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Upsert points into a collection, waiting for the backend to
    /// acknowledge durability.
    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()>;

    /// Search for the `limit` most similar points to the given vector.
    ///
    /// Returns hits with payloads but without vectors, ordered by descending
    /// similarity score. Results scoring below `score_threshold` are excluded
    /// by the backend. `filter` restricts the search to points matching a
    /// conjunctive equality predicate.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredPoint>>;

    /// Delete points by id, waiting for acknowledgement.
    async fn delete_by_ids(&self, collection: &str, ids: &[String]) -> Result<()>;

    /// Delete all points matching a conjunctive equality filter.
    ///
    /// Success means the delete request was accepted; backends do not report
    /// how many points were removed.
    async fn delete_by_filter(&self, collection: &str, filter: &MetadataFilter) -> Result<()>;

    /// Fetch one page of points matching a filter, including vectors.
    ///
    /// Pass the previous page's `next_offset` to continue; a `None`
    /// `next_offset` in the returned page signals the end of the scan.
    async fn scroll(
        &self,
        collection: &str,
        filter: &MetadataFilter,
        page_size: usize,
        offset: Option<String>,
    ) -> Result<ScrollPage>;
}
