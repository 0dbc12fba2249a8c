// Public modules
pub mod engine;
pub mod message;

// Re-exports
pub use engine::{EngineDescriptor, ModelDescriptor, ProviderKind, TemperatureSettings};
pub use message::{Message, MessageRole};
