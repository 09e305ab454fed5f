use std::sync::Arc;

use clap::Parser;
use parley_config::ConfigManager;
use parley_server::{logging::init_logging, run_server, AppState};

#[derive(Parser, Debug, Clone)]
#[command(name = "parley-server")]
#[command(about = "Parley LLM chat relay server")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, env = "DEBUG", default_value = "false")]
    debug: bool,

    /// Listen host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// LLM model name (overrides config)
    #[arg(long, env = "LLM_MODEL")]
    model: Option<String>,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Log level (overrides config)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Config file path
    #[arg(long, env = "PARLEY_CONFIG", default_value = "~/.parley/config.json")]
    config: String,

    /// Disable config hot-reload
    #[arg(long, default_value = "false")]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 展开配置文件路径
    let config_path = parley_config::expand_tilde(&cli.config)
        .unwrap_or_else(|| std::path::PathBuf::from(&cli.config));

    // 加载配置
    let config_manager = match ConfigManager::load(&config_path).await {
        Ok(cm) => cm,
        Err(e) => {
            eprintln!("Failed to load config from {:?}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    // CLI 参数覆盖配置文件
    if let Some(model) = &cli.model {
        if let Err(e) = config_manager.update(|c| c.llm.model = model.clone()).await {
            eprintln!("Invalid --model override: {}", e);
            std::process::exit(1);
        }
    }
    let config = config_manager.snapshot().await;

    // 初始化日志
    let log_level = cli.log_level.clone().unwrap_or_else(|| {
        if cli.debug {
            "debug".to_string()
        } else {
            config.logging.level.as_str().to_string()
        }
    });
    init_logging(&log_level, config.logging.json)?;
    tracing::info!("Config loaded from {:?}", config_path);

    let api_key = match cli
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .or_else(|| config.llm.api_key())
    {
        Some(key) => key,
        None => {
            tracing::error!(
                "No API key: set {} or pass --api-key",
                config.llm.api_key_env
            );
            std::process::exit(1);
        }
    };

    // 启动热重载（如果未禁用）
    #[cfg(feature = "hot-reload")]
    let config_manager = {
        let mut manager = config_manager;
        if !cli.no_watch {
            if let Err(e) = manager.watch(|| {
                tracing::info!("Config hot-reloaded; auth tokens updated");
            }) {
                tracing::warn!("Failed to start config watcher: {}", e);
            }
        }
        manager
    };

    let host = cli.host.clone().unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);

    tracing::info!("Starting Parley Server on {}:{}", host, port);
    tracing::info!("  Model: {}", config.llm.model);
    tracing::info!("  Max tokens: {}", config.llm.max_tokens);
    tracing::info!("  Storage: {:?}", config.storage.storage_type);
    tracing::info!("  Collection: {}", config.storage.collection);
    tracing::debug!("  CORS: {}", config.server.cors);
    tracing::debug!("  WebSocket auth required: {}", config.auth.ws_requires_auth);

    let state = Arc::new(AppState::from_config(config_manager, api_key).await?);

    run_server(state, &host, port, config.server.cors).await
}
