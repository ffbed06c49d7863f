//! End-to-end storage and retrieval scenarios over the in-memory backend.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use ragstore::{
    Chunker, ChunkerFn, CollectionConfig, DistanceMetric, EmbeddingProvider, InMemoryVectorStore, Metadata,
    MetadataFilter, RagStorage, RagStorageConfig, RagStorageError, Result, RetrievalOptions,
    ScoredPoint, ScrollPage, StorageProvider, StoredPoint, VectorStore,
};

const DIM: usize = 8;

/// Deterministic text embedding: byte histogram folded into `dim` buckets,
/// L2-normalized. Identical texts embed identically; the vector is never zero.
fn embed_text(text: &str, dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    for (i, b) in text.bytes().enumerate() {
        v[i % dim] += f32::from(b) / 255.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        v[0] = 1.0;
    } else {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Unit basis vector along the given axis.
fn axis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[i] = 1.0;
    v
}

/// An embedding provider that embeds deterministically, serves exact vectors
/// for scripted texts, and fails the configured batch slots.
struct ScriptedEmbedder {
    dimensions: usize,
    fail_slots: HashSet<usize>,
    fail_batch: bool,
    fixed: HashMap<String, Vec<f32>>,
}

impl ScriptedEmbedder {
    fn new() -> Self {
        Self { dimensions: DIM, fail_slots: HashSet::new(), fail_batch: false, fixed: HashMap::new() }
    }

    fn failing_slots(slots: impl IntoIterator<Item = usize>) -> Self {
        Self { fail_slots: slots.into_iter().collect(), ..Self::new() }
    }

    fn failing_batch() -> Self {
        Self { fail_batch: true, ..Self::new() }
    }

    fn with_fixed(pairs: impl IntoIterator<Item = (&'static str, Vec<f32>)>) -> Self {
        let fixed = pairs.into_iter().map(|(text, v)| (text.to_string(), v)).collect();
        Self { fixed, ..Self::new() }
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Option<Vec<f32>>>> {
        if self.fail_batch {
            return Err(RagStorageError::Embedding {
                provider: self.name().to_string(),
                message: "batch rejected".to_string(),
            });
        }
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                if self.fail_slots.contains(&i) {
                    None
                } else if let Some(v) = self.fixed.get(*text) {
                    Some(v.clone())
                } else {
                    Some(embed_text(text, self.dimensions))
                }
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Wraps an [`InMemoryVectorStore`] and counts backend calls, so tests can
/// assert that no-op paths really skip the store.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryVectorStore,
    upserts: AtomicUsize,
    deletes: AtomicUsize,
    scrolls: AtomicUsize,
}

#[async_trait]
impl VectorStore for CountingStore {
    async fn ensure_collection(
        &self,
        name: &str,
        vector_size: u64,
        distance: DistanceMetric,
    ) -> Result<()> {
        self.inner.ensure_collection(name, vector_size, distance).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name).await
    }

    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(collection, points).await
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        self.inner.search(collection, vector, limit, score_threshold, filter).await
    }

    async fn delete_by_ids(&self, collection: &str, ids: &[String]) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_ids(collection, ids).await
    }

    async fn delete_by_filter(&self, collection: &str, filter: &MetadataFilter) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_filter(collection, filter).await
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: &MetadataFilter,
        page_size: usize,
        offset: Option<String>,
    ) -> Result<ScrollPage> {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        self.inner.scroll(collection, filter, page_size, offset).await
    }
}

fn test_config() -> RagStorageConfig {
    RagStorageConfig::builder()
        .collection(CollectionConfig::new("test_docs", DIM as u64))
        .build()
        .expect("valid test config")
}

async fn storage_over(store: Arc<dyn VectorStore>) -> RagStorage {
    RagStorage::builder()
        .config(test_config())
        .vector_store(store)
        .embedding_provider(Arc::new(ScriptedEmbedder::new()))
        .create()
        .await
        .expect("facade creation")
}

fn source_filter(source: &str) -> MetadataFilter {
    HashMap::from([("source".to_string(), Value::String(source.to_string()))])
}

fn source_metadata(source: &str) -> Metadata {
    HashMap::from([("source".to_string(), Value::String(source.to_string()))])
}

/// Splits one chunk per line; used to produce a known chunk count.
fn line_chunker() -> Arc<dyn Chunker> {
    Arc::new(ChunkerFn(|text: &str| text.lines().map(str::to_string).collect::<Vec<String>>()))
}

#[tokio::test]
async fn empty_content_returns_no_ids_and_skips_the_store() {
    let store = Arc::new(CountingStore::default());
    let storage = storage_over(store.clone()).await;

    let ids = storage.add_document("", None).await.unwrap();

    assert!(ids.is_empty());
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn partial_embedding_failure_keeps_surviving_chunks() {
    let store = Arc::new(CountingStore::default());
    let storage = RagStorage::builder()
        .config(test_config())
        .vector_store(store.clone())
        .embedding_provider(Arc::new(ScriptedEmbedder::failing_slots([1])))
        .chunker(line_chunker())
        .create()
        .await
        .unwrap();

    let ids = storage
        .add_document("alpha\nbeta\ngamma", Some(source_metadata("doc.txt")))
        .await
        .unwrap();

    assert_eq!(ids.len(), 2);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 1);

    let points = storage.get_documents_by_metadata(&source_filter("doc.txt")).await.unwrap();
    assert_eq!(points.len(), 2);

    // The skipped chunk's index is preserved, not compacted.
    let mut indexes: Vec<i64> = points
        .iter()
        .map(|p| p.payload.get("chunk_index").and_then(Value::as_i64).unwrap())
        .collect();
    indexes.sort_unstable();
    assert_eq!(indexes, vec![0, 2]);
}

#[tokio::test]
async fn total_embedding_failure_returns_empty_without_upsert() {
    let store = Arc::new(CountingStore::default());
    let storage = RagStorage::builder()
        .config(test_config())
        .vector_store(store.clone())
        .embedding_provider(Arc::new(ScriptedEmbedder::failing_slots([0, 1, 2])))
        .chunker(line_chunker())
        .create()
        .await
        .unwrap();

    let ids = storage.add_document("a\nb\nc", None).await.unwrap();

    assert!(ids.is_empty());
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn retrieval_is_ordered_by_descending_score() {
    let embedder = ScriptedEmbedder::with_fixed([
        ("doc high", axis(0)),
        ("doc mid", vec![0.7, 0.7, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ("doc low", axis(1)),
        ("which doc?", axis(0)),
    ]);
    let storage = RagStorage::builder()
        .config(test_config())
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .embedding_provider(Arc::new(embedder))
        .create()
        .await
        .unwrap();
    for content in ["doc low", "doc high", "doc mid"] {
        storage.add_document(content, None).await.unwrap();
    }

    let chunks = storage
        .retrieve_context("which doc?", RetrievalOptions::default().limit(3))
        .await
        .unwrap();

    assert_eq!(chunks.len(), 3);
    for window in chunks.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["doc high", "doc mid", "doc low"]);
}

#[tokio::test]
async fn score_threshold_excludes_low_scoring_results() {
    let embedder = ScriptedEmbedder::with_fixed([
        ("on topic", axis(0)),
        ("off topic", axis(1)),
        ("the query", axis(0)),
    ]);
    let storage = RagStorage::builder()
        .config(test_config())
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .embedding_provider(Arc::new(embedder))
        .create()
        .await
        .unwrap();
    storage.add_document("on topic", None).await.unwrap();
    storage.add_document("off topic", None).await.unwrap();

    let threshold = 0.5;
    let chunks = storage
        .retrieve_context(
            "the query",
            RetrievalOptions::default().limit(10).score_threshold(threshold),
        )
        .await
        .unwrap();

    assert_eq!(chunks.len(), 1);
    assert!(chunks.iter().all(|c| c.score >= threshold));
    assert_eq!(chunks[0].content, "on topic");
}

#[tokio::test]
async fn default_limit_caps_result_count() {
    let storage = storage_over(Arc::new(InMemoryVectorStore::new())).await;
    for i in 0..8 {
        storage.add_document(format!("document number {i}"), None).await.unwrap();
    }

    let chunks =
        storage.retrieve_context("document", RetrievalOptions::default()).await.unwrap();

    assert_eq!(chunks.len(), storage.config().default_retrieval_limit);
    assert_eq!(chunks.len(), 5);
}

#[tokio::test]
async fn retrieval_filter_scopes_results() {
    let storage = storage_over(Arc::new(InMemoryVectorStore::new())).await;
    storage.add_document("apples and pears", Some(source_metadata("a.txt"))).await.unwrap();
    storage.add_document("apples and plums", Some(source_metadata("b.txt"))).await.unwrap();

    let chunks = storage
        .retrieve_context(
            "apples",
            RetrievalOptions::default().limit(10).filter(source_filter("b.txt")),
        )
        .await
        .unwrap();

    assert_eq!(chunks.len(), 1);
    let metadata = chunks[0].metadata.as_ref().unwrap();
    assert_eq!(metadata.get("source"), Some(&json!("b.txt")));
}

#[tokio::test]
async fn batch_embedding_error_fails_ingestion_and_retrieval() {
    let storage = RagStorage::builder()
        .config(test_config())
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .embedding_provider(Arc::new(ScriptedEmbedder::failing_batch()))
        .create()
        .await
        .unwrap();

    let err = storage.add_document("some content", None).await.unwrap_err();
    assert!(matches!(err, RagStorageError::Embedding { .. }));

    let err =
        storage.retrieve_context("anything", RetrievalOptions::default()).await.unwrap_err();
    assert!(matches!(err, RagStorageError::Embedding { .. }));
}

#[tokio::test]
async fn absent_query_embedding_is_an_embedding_error() {
    let storage = RagStorage::builder()
        .config(test_config())
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .embedding_provider(Arc::new(ScriptedEmbedder::failing_slots([0])))
        .create()
        .await
        .unwrap();

    let err =
        storage.retrieve_context("anything", RetrievalOptions::default()).await.unwrap_err();

    match err {
        RagStorageError::Embedding { provider, .. } => assert_eq!(provider, "scripted"),
        other => panic!("expected an embedding error, got {other}"),
    }
}

#[tokio::test]
async fn payload_without_string_content_maps_to_empty_content() {
    let store = Arc::new(InMemoryVectorStore::new());
    let storage = storage_over(store.clone()).await;

    // Points written by external tooling: one missing the content field
    // entirely, one carrying a non-string content value.
    let vector = embed_text("query", DIM);
    store
        .upsert(
            "test_docs",
            vec![
                StoredPoint {
                    id: "legacy-1".to_string(),
                    vector: vector.clone(),
                    payload: HashMap::from([("source".to_string(), json!("legacy.txt"))]),
                },
                StoredPoint {
                    id: "legacy-2".to_string(),
                    vector,
                    payload: HashMap::from([("content".to_string(), json!(42))]),
                },
            ],
        )
        .await
        .unwrap();

    let chunks = storage.retrieve_context("query", RetrievalOptions::default()).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| c.content.is_empty()));
    let with_source = chunks
        .iter()
        .find(|c| c.metadata.is_some())
        .expect("the point with extra payload keeps them as metadata");
    assert_eq!(with_source.metadata.as_ref().unwrap().get("source"), Some(&json!("legacy.txt")));
}

#[tokio::test]
async fn ubc_end_to_end() {
    let storage = storage_over(Arc::new(InMemoryVectorStore::new())).await;
    let text = "UBC is a public research university.";
    let ids = storage.add_document(text, Some(source_metadata("a.txt"))).await.unwrap();
    assert_eq!(ids.len(), 1);

    let chunks = storage
        .retrieve_context("Tell me about UBC", RetrievalOptions::default().limit(1))
        .await
        .unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, text);
    let metadata = chunks[0].metadata.as_ref().unwrap();
    assert_eq!(metadata.get("source"), Some(&json!("a.txt")));
}

#[tokio::test]
async fn metadata_scan_returns_only_matching_documents() {
    let storage = storage_over(Arc::new(InMemoryVectorStore::new())).await;
    let first = storage
        .add_document("first document body", Some(source_metadata("a.txt")))
        .await
        .unwrap();
    let second = storage
        .add_document("second document body", Some(source_metadata("b.txt")))
        .await
        .unwrap();

    let points = storage.get_documents_by_metadata(&source_filter("b.txt")).await.unwrap();

    assert_eq!(points.len(), second.len());
    assert!(points.iter().all(|p| second.contains(&p.id)));
    assert!(points.iter().all(|p| !first.contains(&p.id)));
}

#[tokio::test]
async fn metadata_scan_follows_the_scroll_cursor_across_pages() {
    let store = Arc::new(CountingStore::default());
    let storage = RagStorage::builder()
        .config(test_config())
        .vector_store(store.clone())
        .embedding_provider(Arc::new(ScriptedEmbedder::new()))
        .chunker(line_chunker())
        .create()
        .await
        .unwrap();

    let content: String =
        (0..250).map(|i| format!("line number {i} with some padding\n")).collect();
    let ids = storage.add_document(content, Some(source_metadata("bulk.txt"))).await.unwrap();
    assert_eq!(ids.len(), 250);

    let points = storage.get_documents_by_metadata(&source_filter("bulk.txt")).await.unwrap();

    assert_eq!(points.len(), 250);
    // 250 points at a page size of 100 takes three pages.
    assert!(store.scrolls.load(Ordering::SeqCst) >= 3);
    assert!(points.iter().all(|p| p.vector.len() == DIM));
}

#[tokio::test]
async fn empty_id_delete_is_a_noop_without_backend_call() {
    let store = Arc::new(CountingStore::default());
    let storage = storage_over(store.clone()).await;

    storage.delete_documents_by_ids(&[]).await.unwrap();

    assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_filter_delete_is_a_noop_without_backend_call() {
    let store = Arc::new(CountingStore::default());
    let storage = storage_over(store.clone()).await;

    storage.delete_documents_by_metadata(&HashMap::new()).await.unwrap();

    assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn delete_by_ids_removes_the_points() {
    let storage = storage_over(Arc::new(InMemoryVectorStore::new())).await;
    let ids =
        storage.add_document("to be removed", Some(source_metadata("x.txt"))).await.unwrap();

    storage.delete_documents_by_ids(&ids).await.unwrap();

    let points = storage.get_documents_by_metadata(&source_filter("x.txt")).await.unwrap();
    assert!(points.is_empty());
}

#[tokio::test]
async fn delete_by_metadata_removes_only_matching_points() {
    let storage = storage_over(Arc::new(InMemoryVectorStore::new())).await;
    storage.add_document("keep me", Some(source_metadata("keep.txt"))).await.unwrap();
    storage.add_document("drop me", Some(source_metadata("drop.txt"))).await.unwrap();

    storage.delete_documents_by_metadata(&source_filter("drop.txt")).await.unwrap();

    assert!(storage.get_documents_by_metadata(&source_filter("drop.txt")).await.unwrap().is_empty());
    assert_eq!(storage.get_documents_by_metadata(&source_filter("keep.txt")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_storage_is_idempotent() {
    let storage = storage_over(Arc::new(InMemoryVectorStore::new())).await;

    storage.delete_storage().await.unwrap();
    // The collection is gone now; tearing down again must still succeed.
    storage.delete_storage().await.unwrap();
}

#[tokio::test]
async fn missing_embeddings_config_fails_before_any_io() {
    let result = RagStorage::builder()
        .config(test_config())
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .create()
        .await;

    assert!(matches!(result, Err(RagStorageError::Config(_))));
}

#[tokio::test]
async fn missing_backend_config_fails_before_any_io() {
    let result = RagStorage::builder()
        .config(test_config())
        .embedding_provider(Arc::new(ScriptedEmbedder::new()))
        .create()
        .await;

    assert!(matches!(result, Err(RagStorageError::Config(_))));
}

#[tokio::test]
async fn missing_config_fails_before_any_io() {
    let result = RagStorage::builder().create().await;
    assert!(matches!(result, Err(RagStorageError::Config(_))));
}

#[tokio::test]
async fn operations_require_initialization() {
    let provider = StorageProvider::new(
        line_chunker(),
        Arc::new(ScriptedEmbedder::new()),
        Arc::new(InMemoryVectorStore::new()),
        "uninitialized",
        DIM as u64,
        DistanceMetric::Cosine,
    );

    let result = provider.add_document(&ragstore::Document::new("text")).await;
    assert!(matches!(result, Err(RagStorageError::NotReady)));

    let result = provider.retrieve_context("query", 5, None, None).await;
    assert!(matches!(result, Err(RagStorageError::NotReady)));
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let provider = StorageProvider::new(
        line_chunker(),
        Arc::new(ScriptedEmbedder::new()),
        Arc::new(InMemoryVectorStore::new()),
        "twice",
        DIM as u64,
        DistanceMetric::Cosine,
    );

    provider.initialize().await.unwrap();
    provider.initialize().await.unwrap();
    assert_eq!(provider.collection_name(), "twice");
}

#[tokio::test]
async fn reingesting_identical_content_creates_new_points() {
    let storage = storage_over(Arc::new(InMemoryVectorStore::new())).await;
    let first = storage
        .add_document("same content twice", Some(source_metadata("dup.txt")))
        .await
        .unwrap();
    let second = storage
        .add_document("same content twice", Some(source_metadata("dup.txt")))
        .await
        .unwrap();

    assert_ne!(first, second);
    let points = storage.get_documents_by_metadata(&source_filter("dup.txt")).await.unwrap();
    assert_eq!(points.len(), 2);
}
