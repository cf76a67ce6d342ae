pub mod client;
pub mod prompts;

pub use client::{parse_structured, CompletionModel, LlmClient, ValidateResponse};
