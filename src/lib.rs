//! rbot: a command-line and browser chat client for OpenAI and Anthropic
//! models.
//!
//! Engines and models come from an `engines.yaml` catalog. Decorator files
//! become system messages that prime every conversation, and conversations
//! can be saved and resumed from the data directory.

// Public modules
pub mod catalog;
pub mod chat;
pub mod client;
pub mod context;
pub mod decorators;
pub mod error;
pub mod history;
pub mod observability;
pub mod output;
pub mod render;
pub mod types;
pub mod web;

// Re-exports
pub use catalog::EngineCatalog;
pub use client::{ChatRequest, Dispatcher, PreambleState, ProviderDispatcher, Reply, Usage};
pub use context::AppContext;
pub use decorators::DecoratorSet;
pub use error::{Error, ProviderErrorKind, Result};
pub use history::{History, SessionStore};
pub use observability::{init_tracing, register_biometrics};
pub use output::{batch_output, extract_structured_output};
pub use types::*;
