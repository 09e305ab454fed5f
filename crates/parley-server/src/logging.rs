//! 日志初始化
//!
//! 基于 tracing-subscriber 的结构化日志。

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化全局日志
///
/// `directive` is an `EnvFilter` directive such as `info` or
/// `parley_server=debug,tower_http=info`.
pub fn init_logging(directive: &str, json: bool) -> anyhow::Result<()> {
    let filter = build_filter(directive)?;
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true);
        registry.with(layer).try_init()?;
    } else {
        let layer = tracing_subscriber::fmt::layer().with_target(true);
        registry.with(layer).try_init()?;
    }

    Ok(())
}

fn build_filter(directive: &str) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", directive, e))
}
