pub mod adapters;
pub mod client;
pub mod error;
pub mod provider;
pub mod providers;

// Re-export core types
pub use adapters::{ContentBlock, MessagesRequest, MessagesResponse};
pub use client::{collect_text, CompletionClient};
pub use error::{LLMError, Result};
pub use provider::{AuthConfig, LLMProvider, ProviderCapabilities, ProviderConfig, ProviderMetadata};
pub use providers::AnthropicProvider;
