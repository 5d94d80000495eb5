// Embedding generation module
// Turns text into fixed-length vectors via an external model provider

pub mod openai;

pub use openai::OpenAiEmbeddingClient;

use crate::Result;

/// Provider-agnostic embedding seam. The pipelines only depend on this
/// trait, so tests can substitute call-counting doubles.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single non-empty text. Safe to call concurrently with
    /// independent inputs.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts in one provider round trip, preserving input
    /// order. An empty batch returns an empty Vec without a network call.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Fixed dimensionality of every vector this provider returns.
    fn dimensions(&self) -> usize;
}
