//! biolab-providers: Generative AI provider integrations.
//!
//! Implements the `LlmProvider` trait for Gemini, OpenAI and Anthropic, plus
//! a deterministic mock, and loads `biolab.toml`.

pub mod anthropic;
pub mod config;
pub mod error;
pub mod gemini;
mod http;
pub mod mock;
pub mod openai;

pub use config::{create_provider, load_config, load_config_from, BiolabConfig, ProviderConfig};
pub use error::ProviderError;
