//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragstore::qdrant::QdrantVectorStore;
//! use ragstore::DistanceMetric;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334")?;
//! store.ensure_collection("docs", 384, DistanceMetric::Cosine).await?;
//! store.upsert("docs", points).await?;
//! let hits = store.search("docs", &query_vector, 5, None, None).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointId,
    PointStruct, PointsIdsList, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::debug;

use crate::config::QdrantConfig;
use crate::document::{Metadata, MetadataFilter, ScoredPoint, ScrollPage, StoredPoint};
use crate::error::{RagStorageError, Result};
use crate::vectorstore::{DistanceMetric, VectorStore};

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Wraps a [`qdrant_client::Qdrant`] client. Point payloads are stored as
/// Qdrant payload objects; metadata filters become conjunctive
/// field-equals-value conditions.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(|e| Self::op_err("connect", e))?;
        Ok(Self { client })
    }

    /// Create a new Qdrant vector store from a [`QdrantConfig`] section.
    pub fn from_config(config: &QdrantConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .build()
            .map_err(|e| Self::op_err("connect", e))?;
        Ok(Self { client })
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn op_err(operation: &str, e: qdrant_client::QdrantError) -> RagStorageError {
        RagStorageError::VectorStore {
            backend: "qdrant".to_string(),
            message: format!("{operation} failed: {e}"),
        }
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let collections =
            self.client.list_collections().await.map_err(|e| Self::op_err("list collections", e))?;
        Ok(collections.collections.iter().any(|c| c.name == name))
    }

    /// Translate a flat equality map into a conjunctive Qdrant filter.
    ///
    /// Qdrant match conditions cover keywords, integers, and booleans;
    /// non-integer numbers and composite values have no exact-match form and
    /// are rejected.
    fn build_filter(filter: &MetadataFilter) -> Result<Filter> {
        let mut conditions = Vec::with_capacity(filter.len());
        for (field, value) in filter {
            let condition = match value {
                serde_json::Value::String(s) => Condition::matches(field.clone(), s.clone()),
                serde_json::Value::Bool(b) => Condition::matches(field.clone(), *b),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => Condition::matches(field.clone(), i),
                    None => {
                        return Err(RagStorageError::VectorStore {
                            backend: "qdrant".to_string(),
                            message: format!(
                                "unsupported filter value for field '{field}': non-integer numbers cannot be matched exactly"
                            ),
                        });
                    }
                },
                other => {
                    return Err(RagStorageError::VectorStore {
                        backend: "qdrant".to_string(),
                        message: format!(
                            "unsupported filter value for field '{field}': {other} is not a scalar"
                        ),
                    });
                }
            };
            conditions.push(condition);
        }
        Ok(Filter::must(conditions))
    }

    fn to_payload(payload: &Metadata) -> Payload {
        let map: serde_json::Map<String, serde_json::Value> =
            payload.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Payload::try_from(serde_json::Value::Object(map)).unwrap_or_default()
    }

    fn value_to_json(value: &QdrantValue) -> serde_json::Value {
        match &value.kind {
            None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
            Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
            Some(Kind::IntegerValue(i)) => serde_json::Value::from(*i),
            Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
            Some(Kind::ListValue(list)) => {
                serde_json::Value::Array(list.values.iter().map(Self::value_to_json).collect())
            }
            Some(Kind::StructValue(s)) => serde_json::Value::Object(
                s.fields.iter().map(|(k, v)| (k.clone(), Self::value_to_json(v))).collect(),
            ),
        }
    }

    fn payload_to_json(payload: &HashMap<String, QdrantValue>) -> Metadata {
        payload.iter().map(|(k, v)| (k.clone(), Self::value_to_json(v))).collect()
    }

    fn point_id_to_string(id: &PointId) -> Option<String> {
        match &id.point_id_options {
            Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
            Some(PointIdOptions::Num(n)) => Some(n.to_string()),
            None => None,
        }
    }

    /// Inverse of [`point_id_to_string`](Self::point_id_to_string). Qdrant
    /// point ids are either UUIDs or unsigned integers; an all-digit string
    /// can only have come from the numeric variant and must go back as one,
    /// or cursors over externally created points would not resume.
    fn point_id_from_string(id: &str) -> PointId {
        match id.parse::<u64>() {
            Ok(n) => PointId::from(n),
            Err(_) => PointId::from(id),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        vector_size: u64,
        distance: DistanceMetric,
    ) -> Result<()> {
        if self.collection_exists(name).await? {
            debug!(collection = name, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        let distance = match distance {
            DistanceMetric::Cosine => Distance::Cosine,
            DistanceMetric::Euclid => Distance::Euclid,
            DistanceMetric::Dot => Distance::Dot,
        };

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(vector_size, distance)),
            )
            .await
            .map_err(|e| Self::op_err("create collection", e))?;

        debug!(collection = name, vector_size, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        if !self.collection_exists(name).await? {
            debug!(collection = name, "qdrant collection absent, nothing to delete");
            return Ok(());
        }

        self.client
            .delete_collection(name)
            .await
            .map_err(|e| Self::op_err("delete collection", e))?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let count = points.len();
        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|point| {
                let payload = Self::to_payload(&point.payload);
                PointStruct::new(point.id, point.vector, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| Self::op_err("upsert", e))?;

        debug!(collection, count, "upserted points to qdrant");
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
        // Payload only; vectors are not needed by callers of the search path.
        let mut request = SearchPointsBuilder::new(collection, vector.to_vec(), limit as u64)
            .with_payload(true);
        if let Some(threshold) = score_threshold {
            request = request.score_threshold(threshold);
        }
        if let Some(filter) = filter {
            request = request.filter(Self::build_filter(filter)?);
        }

        let response =
            self.client.search_points(request).await.map_err(|e| Self::op_err("search", e))?;

        let hits = response
            .result
            .into_iter()
            .map(|scored| ScoredPoint {
                id: scored.id.as_ref().and_then(Self::point_id_to_string).unwrap_or_default(),
                score: scored.score,
                payload: Self::payload_to_json(&scored.payload),
            })
            .collect();

        Ok(hits)
    }

    async fn delete_by_ids(&self, collection: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let point_ids: Vec<PointId> =
            ids.iter().map(|id| Self::point_id_from_string(id)).collect();

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList { ids: point_ids })
                    .wait(true),
            )
            .await
            .map_err(|e| Self::op_err("delete points", e))?;

        debug!(collection, count = ids.len(), "deleted points from qdrant");
        Ok(())
    }

    async fn delete_by_filter(&self, collection: &str, filter: &MetadataFilter) -> Result<()> {
        let filter = Self::build_filter(filter)?;

        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(filter).wait(true))
            .await
            .map_err(|e| Self::op_err("delete by filter", e))?;

        debug!(collection, "deleted points from qdrant by filter");
        Ok(())
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: &MetadataFilter,
        page_size: usize,
        offset: Option<String>,
    ) -> Result<ScrollPage> {
        // Vectors are requested back here: scroll serves the administrative
        // path, which returns full points.
        let mut request = ScrollPointsBuilder::new(collection)
            .filter(Self::build_filter(filter)?)
            .limit(page_size as u32)
            .with_payload(true)
            .with_vectors(true);
        if let Some(offset) = offset {
            request = request.offset(Self::point_id_from_string(&offset));
        }

        let response = self.client.scroll(request).await.map_err(|e| Self::op_err("scroll", e))?;

        let points = response
            .result
            .into_iter()
            .map(|point| {
                let vector = point
                    .vectors
                    .and_then(|v| v.vectors_options)
                    .map(|options| match options {
                        VectorsOptions::Vector(v) => v.data,
                        VectorsOptions::Vectors(_) => Vec::new(),
                    })
                    .unwrap_or_default();
                StoredPoint {
                    id: point.id.as_ref().and_then(Self::point_id_to_string).unwrap_or_default(),
                    vector,
                    payload: Self::payload_to_json(&point.payload),
                }
            })
            .collect();

        let next_offset =
            response.next_page_offset.as_ref().and_then(Self::point_id_to_string);

        Ok(ScrollPage { points, next_offset })
    }
}
