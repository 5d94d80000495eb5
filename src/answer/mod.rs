// Query pipeline module
// Embed the question, retrieve neighbors, answer under grounding rules

#[cfg(test)]
mod tests;

pub mod prompt;

use std::sync::Arc;
use tracing::{debug, info};

use crate::chat::ChatProvider;
use crate::embeddings::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::{RagError, Result};

/// Answers one user question grounded in the top-k most similar catalog
/// documents. Stateless: every call is an independent unit of work with no
/// shared mutable state, so one instance may serve concurrent requests.
pub struct Answerer {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    chat: Arc<dyn ChatProvider>,
    top_k: usize,
}

impl Answerer {
    #[inline]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        chat: Arc<dyn ChatProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            chat,
            top_k,
        }
    }

    /// Produce a grounded answer for the user's question.
    ///
    /// An empty question fails with `InvalidInput` before any provider is
    /// called. Zero retrieval hits are not an error: the groundedness rules
    /// in the system instruction make the model report insufficient
    /// information instead. The completion text is returned verbatim; the
    /// model is trusted to honor its instruction, with no post-hoc check.
    #[inline]
    pub async fn answer(&self, user_query: &str) -> Result<String> {
        let user_query = user_query.trim();
        if user_query.is_empty() {
            return Err(RagError::InvalidInput(
                "question must not be empty".to_string(),
            ));
        }

        debug!("Answering question ({} chars)", user_query.len());

        let query_vector = self.embedder.embed(user_query)?;
        let hits = self.index.query(&query_vector, self.top_k).await?;
        debug!("Retrieved {} grounding documents", hits.len());

        let messages = prompt::build_messages(&hits, user_query);
        let completion = self.chat.complete(&messages)?;

        info!(
            "Answered question with {} grounding documents ({} chars)",
            hits.len(),
            completion.len()
        );
        Ok(completion)
    }
}
