//! HTTP Server - 提供 REST API 和 WebSocket 支持

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{ask_ai, health_handler};
use crate::middleware::resolve_identity;
use crate::state::AppState;
use crate::websocket::ws_handler;

/// 创建路由
pub fn create_router(state: Arc<AppState>, cors: bool) -> Router {
    let router = Router::new()
        // 健康检查
        .route("/health", get(health_handler))
        // WebSocket
        .route("/ws", get(ws_handler))
        // 同步问答
        .route("/api/ask/ai", post(ask_ai))
        // 中间件
        .layer(middleware::from_fn_with_state(state.clone(), resolve_identity))
        .layer(TraceLayer::new_for_http());

    let router = if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, cors: bool, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state, cors);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// 运行 HTTP 服务器，Ctrl-C 时优雅退出
pub async fn run_server(state: Arc<AppState>, host: &str, port: u16, cors: bool) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Parley server starting on http://{}", addr);
    tracing::info!("WebSocket endpoint: ws://{}/ws", addr);

    serve(listener, state, cors, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
