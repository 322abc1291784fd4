//! The seam between Kiln and a text-generation backend.

use async_trait::async_trait;
use kiln_core::GenerationError;
use kiln_core::task_mode::SamplingConfig;

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Fully rendered prompt text.
    pub prompt: String,
    pub sampling: SamplingConfig,
    /// The user's own words when `prompt` wraps them in instructions.
    pub user_input: Option<String>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, sampling: SamplingConfig) -> Self {
        Self {
            prompt: prompt.into(),
            sampling,
            user_input: None,
        }
    }

    pub fn with_user_input(mut self, input: impl Into<String>) -> Self {
        self.user_input = Some(input.into());
        self
    }
}

/// A backend that turns a prompt into raw completion text.
///
/// Implementations must be cheap to share: callers hold them as
/// `Arc<dyn TextGenerator>` and may issue calls concurrently.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError>;
}
