pub mod config;
pub mod metadata;

pub use config::{ProviderConfig, AuthConfig};
pub use metadata::{ProviderMetadata, ProviderCapabilities, LLMProvider};
