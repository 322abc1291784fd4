//! Domain core of the Kiln app builder.
//!
//! Holds the project model and everything that can be computed from it
//! without talking to a model provider: the completion parser, the state
//! store, preview composition, the export format, and the build roster.

pub mod build;
pub mod config;
pub mod error;
pub mod export;
pub mod file;
pub mod message;
pub mod parser;
pub mod preview;
pub mod quality;
pub mod state;
pub mod store;
pub mod task_mode;
pub mod templates;

pub use error::{GenerationError, KilnError, Result};
pub use file::{FileRecord, FileSet, Language};
pub use message::{ConversationTurn, Message, MessageRole};
pub use state::ProjectState;
pub use store::ProjectStore;
