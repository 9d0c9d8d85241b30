pub mod client;
pub mod models;
pub mod streaming;

pub use client::{ChatBackend, OllamaClient};
pub use models::{ChatFragment, ChatRequest};
pub use streaming::parse_chat_stream;
