//! LLM module - chat model integrations
//!
//! Provides the provider abstraction used by assistant participants and an
//! OpenAI-compatible client.

pub mod openai;
pub mod traits;

pub use openai::OpenAiClient;
pub use traits::{ChatMessage, GenerateOptions, LLMProvider, LLMResponse, TokenUsage};
