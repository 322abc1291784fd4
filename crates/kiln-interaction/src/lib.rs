//! Model-provider interaction for Kiln.
//!
//! [`TextGenerator`] is the seam every backend implements. [`GenerationClient`]
//! wraps one with prompt construction, sampling selection and completion
//! parsing.

pub mod gemini;
pub mod generation;
pub mod generator;
pub mod offline;
pub mod prompts;
pub mod reasoning;
pub mod secret;

pub use gemini::GeminiApiClient;
pub use generation::{GenerationClient, GenerationOptions, GenerationResult};
pub use generator::{CompletionRequest, TextGenerator};
pub use offline::OfflineGenerator;
pub use secret::SecretStorage;
