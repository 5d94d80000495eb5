// Chat completion module
// Stateless message sequences in, one completion out

pub mod openai;

pub use openai::OpenAiChatClient;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Role of a message within one completion request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a completion request. Requests are stateless: no
/// conversation memory is retained between calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Provider-agnostic chat seam, mirroring `embeddings::EmbeddingProvider`.
pub trait ChatProvider: Send + Sync {
    /// Request one completion for an ordered message sequence and return the
    /// first choice's text verbatim.
    fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}
