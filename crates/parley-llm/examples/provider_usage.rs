//! Ask the Anthropic Messages API one question.
//!
//! ```sh
//! ANTHROPIC_API_KEY=sk-... cargo run -p parley-llm --example provider_usage -- "Why is the sky blue?"
//! ```

use std::sync::Arc;

use parley_llm::{AnthropicProvider, AuthConfig, CompletionClient, LLMProvider, ProviderConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let auth = AuthConfig::from_env("ANTHROPIC_API_KEY").ok_or("ANTHROPIC_API_KEY is not set")?;
    let mut config = ProviderConfig::anthropic();
    config.auth = auth;

    let provider = AnthropicProvider::with_config(config)?;
    provider.validate().await?;

    let model = provider.model().to_string();
    let client = CompletionClient::new(Arc::new(provider), model, 1024);

    let question = std::env::args().nth(1).unwrap_or_else(|| "Say hello.".to_string());
    let answer = client.complete(&question).await?;
    println!("{}", answer);

    Ok(())
}
