pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod llm;
pub mod message;
pub mod session;
pub mod store;

// Re-export key types
pub use config::{KeyBindings, Settings};
pub use controller::ConversationController;
pub use error::{GptError, Result};
pub use llm::{BackendConfig, BackendKind, ChatBackend};
pub use message::{Message, Role, TimestampedMessage};
pub use session::SessionManager;
pub use store::{MessageStore, StoreKind};
