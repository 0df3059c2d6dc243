//! Vigil LLM - LLM Provider Abstraction
//!
//! This crate provides the language-model side of Vigil's oracles:
//! - Provider: the `LlmProvider` trait
//! - Gemini: Google Gemini `generateContent` REST provider
//! - Ollama: Local Ollama provider
//! - Mock: scripted provider for tests and offline runs
//! - Util: JSON extraction from model output, key masking

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod gemini;
pub mod message;
pub mod mock;
pub mod ollama;
pub mod provider;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use provider::{LlmProvider, SharedLlmProvider};

pub use gemini::{GeminiConfig, GeminiProvider};
pub use mock::MockProvider;
pub use ollama::{OllamaConfig, OllamaProvider};
