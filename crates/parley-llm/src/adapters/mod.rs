pub mod anthropic;

pub use anthropic::{
    AnthropicMessage, ContentBlock, ErrorResponse, MessagesRequest, MessagesResponse, Usage,
};
