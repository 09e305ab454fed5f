pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod state;
pub mod websocket;

pub use error::ApiError;
pub use middleware::AuthUser;
pub use server::{create_router, run_server, serve};
pub use state::AppState;
pub use websocket::{SessionGuard, SessionHandle, SessionRegistry, ERROR_REPLY};
