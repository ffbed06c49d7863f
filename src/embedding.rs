//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// The batch contract is per-slot best-effort: the returned sequence has the
/// same length and order as the input, with `None` in any slot whose text
/// could not be embedded. Index alignment between inputs and outputs is what
/// lets ingestion skip individual failed chunks without aborting the batch.
/// A failure of the batch call as a whole is an error.
///
/// # Example
///
/// ```rust,ignore
/// use ragstore::EmbeddingProvider;
///
/// let embeddings = provider.embed_batch(&["first chunk", "second chunk"]).await?;
/// assert_eq!(embeddings.len(), 2);
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// Returns one slot per input, `None` where embedding failed for that
    /// item alone. Successful slots contain vectors of [`dimensions`](Self::dimensions)
    /// length.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Option<Vec<f32>>>>;

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Short name identifying the backing embedding service, used in error
    /// and log context.
    fn name(&self) -> &str;
}
