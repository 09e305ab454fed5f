//! Single-turn completion client
//!
//! Wraps an [`LLMProvider`] with the fixed model and token ceiling used for
//! every turn, and flattens the response into plain text.

use std::sync::Arc;

use crate::adapters::{ContentBlock, MessagesRequest};
use crate::error::Result;
use crate::provider::LLMProvider;

/// Stateless, cheap to clone; safe to share between connections.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.provider.provider_id())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Send `input` as one user message and return the concatenated text.
    ///
    /// The input is forwarded as-is, empty strings included.
    pub async fn complete(&self, input: &str) -> Result<String> {
        let request = MessagesRequest::single_turn(&self.model, self.max_tokens, input);
        let response = self.provider.send(request).await?;

        tracing::debug!(
            response_id = %response.id,
            blocks = response.content.len(),
            output_tokens = response.usage.output_tokens,
            "completion received"
        );

        Ok(collect_text(&response.content))
    }
}

/// Concatenate every `text` block in order, skipping all other block types.
pub fn collect_text(blocks: &[ContentBlock]) -> String {
    blocks.iter().filter_map(ContentBlock::as_text).collect()
}
