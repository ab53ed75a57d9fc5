//! Maum LLM — external chat-completion client.

pub mod backend;
pub mod openai;

pub use backend::{strip_code_fences, CompletionBackend};
pub use openai::OpenAiClient;
