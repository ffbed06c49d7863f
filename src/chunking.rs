//! Document chunking.
//!
//! Provides the [`Chunker`] trait and the default [`FixedSizeChunker`].
//! The [`ChunkerFn`] adapter turns any `Fn(&str) -> Vec<String>` closure
//! into a chunker, so custom splitting strategies can be supplied as plain
//! functions.

/// Default maximum chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// A strategy for splitting text into chunks.
///
/// Implementations return the chunks in document order. Chunk ids, payloads,
/// and embeddings are attached later by the provider.
pub trait Chunker: Send + Sync {
    /// Split text into an ordered sequence of non-empty chunks.
    ///
    /// Returns an empty `Vec` for empty input.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Adapter turning any splitting function into a [`Chunker`].
///
/// # Example
///
/// ```rust,ignore
/// use ragstore::ChunkerFn;
///
/// let by_paragraph = ChunkerFn(|text: &str| {
///     text.split("\n\n").map(str::to_string).collect()
/// });
/// ```
pub struct ChunkerFn<F>(pub F);

impl<F> Chunker for ChunkerFn<F>
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn split(&self, text: &str) -> Vec<String> {
        (self.0)(text)
    }
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// The window start advances by `chunk_size - chunk_overlap` characters per
/// step, and splitting terminates once a window reaches the end of the text.
/// Text no longer than `chunk_size` yields a single chunk equal to the input.
/// Windows are measured in characters and sliced on char boundaries, so
/// multi-byte input is safe.
///
/// `chunk_overlap >= chunk_size` is a caller error rejected at configuration
/// time; the splitter itself still clamps the step to at least one character
/// so it can never loop.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let size = self.chunk_size.max(1);
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= size {
            return vec![text.to_string()];
        }

        let step = size.saturating_sub(self.chunk_overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}
