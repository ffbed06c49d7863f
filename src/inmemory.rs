//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector
//! store backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is
//! suitable for development and testing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{MetadataFilter, ScoredPoint, ScrollPage, StoredPoint};
use crate::error::{RagStorageError, Result};
use crate::vectorstore::{DistanceMetric, VectorStore};

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as nested `HashMap`s: collection name → point id →
/// point. Score thresholds and metadata filters are applied locally; scroll
/// pages over a deterministic id ordering.
///
/// # Example
///
/// ```rust,ignore
/// use ragstore::{InMemoryVectorStore, VectorStore, DistanceMetric};
///
/// let store = InMemoryVectorStore::new();
/// store.ensure_collection("docs", 384, DistanceMetric::Cosine).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, HashMap<String, StoredPoint>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn missing_collection(collection: &str) -> RagStorageError {
        RagStorageError::VectorStore {
            backend: "in-memory".to_string(),
            message: format!("collection '{collection}' does not exist"),
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// True when every filter field is present in the payload with an equal value.
fn matches_filter(point: &StoredPoint, filter: &MetadataFilter) -> bool {
    filter.iter().all(|(field, value)| point.payload.get(field) == Some(value))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        _vector_size: u64,
        _distance: DistanceMetric,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store =
            collections.get_mut(collection).ok_or_else(|| Self::missing_collection(collection))?;
        for point in points {
            store.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().await;
        let store =
            collections.get(collection).ok_or_else(|| Self::missing_collection(collection))?;

        let mut scored: Vec<ScoredPoint> = store
            .values()
            .filter(|point| filter.is_none_or(|f| matches_filter(point, f)))
            .map(|point| ScoredPoint {
                id: point.id.clone(),
                score: cosine_similarity(&point.vector, vector),
                payload: point.payload.clone(),
            })
            .filter(|hit| score_threshold.is_none_or(|t| hit.score >= t))
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete_by_ids(&self, collection: &str, ids: &[String]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store =
            collections.get_mut(collection).ok_or_else(|| Self::missing_collection(collection))?;
        for id in ids {
            store.remove(id);
        }
        Ok(())
    }

    async fn delete_by_filter(&self, collection: &str, filter: &MetadataFilter) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store =
            collections.get_mut(collection).ok_or_else(|| Self::missing_collection(collection))?;
        store.retain(|_, point| !matches_filter(point, filter));
        Ok(())
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: &MetadataFilter,
        page_size: usize,
        offset: Option<String>,
    ) -> Result<ScrollPage> {
        let collections = self.collections.read().await;
        let store =
            collections.get(collection).ok_or_else(|| Self::missing_collection(collection))?;

        let mut matching: Vec<&StoredPoint> =
            store.values().filter(|point| matches_filter(point, filter)).collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));

        // The offset is the id of the first point of the requested page;
        // partition_point keeps the scan stable if that point was deleted
        // between pages.
        let start = match &offset {
            Some(offset) => matching.partition_point(|point| point.id < *offset),
            None => 0,
        };

        let end = (start + page_size).min(matching.len());
        let points = matching[start..end].iter().map(|point| (*point).clone()).collect();
        let next_offset = matching.get(end).map(|point| point.id.clone());

        Ok(ScrollPage { points, next_offset })
    }
}
