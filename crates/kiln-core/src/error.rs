//! Error types for the Kiln workspace.

use thiserror::Error;

/// Failure modes of one call to the text-generation endpoint.
///
/// Each variant is a distinct user-facing condition: a non-success transport
/// status, a safety block, and an empty completion are never folded together.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The endpoint answered with a non-success HTTP status.
    #[error("Gemini API error: {status} - {message}")]
    Http { status: u16, message: String },

    /// The request never produced a response (connect failure, timeout, ...).
    #[error("Gemini API request failed: {0}")]
    Network(String),

    /// The completion was withheld by the provider's safety filter.
    #[error("Response blocked by safety filters ({reason})")]
    SafetyBlocked { reason: String },

    /// The endpoint answered successfully but without any text.
    #[error("No response generated from Gemini API")]
    EmptyCompletion,

    /// The response body could not be decoded.
    #[error("Failed to parse Gemini response: {0}")]
    Decode(String),

    /// A prompt template failed to render.
    #[error("Failed to render prompt: {0}")]
    Prompt(String),

    /// The call was abandoned through its cancellation token.
    #[error("Generation was cancelled")]
    Cancelled,

    /// No API key could be resolved from the environment or secret.json.
    #[error("Gemini API key is not configured")]
    MissingApiKey,
}

impl GenerationError {
    /// Check if this is a safety block
    pub fn is_safety_blocked(&self) -> bool {
        matches!(self, Self::SafetyBlocked { .. })
    }

    /// Check if this error came from cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A shared error type for the entire Kiln workspace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KilnError {
    /// File names must contain at least one non-whitespace character.
    #[error("Invalid file name: '{0}'")]
    InvalidFileName(String),

    /// A generation or build is already in flight.
    #[error("A generation is already in progress")]
    Busy,

    /// The submitted prompt was empty after trimming.
    #[error("Prompt is empty")]
    EmptyPrompt,

    /// A call to the text-generation endpoint failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// An orchestration agent failed and aborted the build.
    #[error("Build failed during {phase} (AI #{agent_id}): {message}")]
    Build {
        phase: String,
        agent_id: u8,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// The operation was superseded by a project reset.
    #[error("Operation cancelled")]
    Cancelled,
}

impl KilnError {
    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Build error
    pub fn build(phase: impl Into<String>, agent_id: u8, message: impl Into<String>) -> Self {
        Self::Build {
            phase: phase.into(),
            agent_id,
            message: message.into(),
        }
    }

    /// Check if this is a build error
    pub fn is_build(&self) -> bool {
        matches!(self, Self::Build { .. })
    }

    /// Check if this error means the work was abandoned rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Generation(GenerationError::Cancelled)
        )
    }
}

impl From<std::io::Error> for KilnError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for KilnError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for KilnError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for KilnError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, KilnError>`.
pub type Result<T> = std::result::Result<T, KilnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_messages_are_distinct() {
        let http = GenerationError::Http {
            status: 500,
            message: "boom".into(),
        };
        let blocked = GenerationError::SafetyBlocked {
            reason: "SAFETY".into(),
        };

        assert!(http.to_string().contains("500"));
        assert!(blocked.to_string().contains("safety"));
        assert_ne!(
            GenerationError::EmptyCompletion.to_string(),
            http.to_string()
        );
        assert!(blocked.is_safety_blocked());
    }

    #[test]
    fn test_cancelled_detection() {
        assert!(KilnError::Cancelled.is_cancelled());
        assert!(KilnError::from(GenerationError::Cancelled).is_cancelled());
        assert!(!KilnError::Busy.is_cancelled());
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let err: KilnError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(err.to_string().contains("NotFound"));
    }
}
