pub mod ask;
pub mod health;

pub use ask::{ask_ai, AskRequest, AskResponse};
pub use health::health_handler;
