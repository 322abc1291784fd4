//! GenerationClient - chat-turn generation on top of a [`TextGenerator`].
//!
//! Builds the prompt, picks sampling parameters, calls the backend and parses
//! the completion into files and a message. [`GenerationClient::generate`]
//! never fails; failures become an apologetic assistant message so the chat
//! keeps working. The orchestrator uses [`GenerationClient::try_generate`].

use std::sync::Arc;

use kiln_core::GenerationError;
use kiln_core::config::DEFAULT_HISTORY_WINDOW;
use kiln_core::file::FileRecord;
use kiln_core::message::ConversationTurn;
use kiln_core::parser::{parse_response, render_file_blocks};
use kiln_core::task_mode::TaskMode;
use tokio_util::sync::CancellationToken;

use crate::generator::{CompletionRequest, TextGenerator};
use crate::prompts::PromptManager;
use crate::reasoning::extract_reasoning;

/// Per-call knobs.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub extra_think_mode: bool,
    pub cancel: CancellationToken,
}

impl GenerationOptions {
    pub fn new(extra_think_mode: bool) -> Self {
        Self {
            extra_think_mode,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Outcome of one chat turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
    pub message: String,
    pub files: Vec<FileRecord>,
    /// Reasoning excerpt, only looked for in think mode.
    pub reasoning: Option<String>,
}

impl GenerationResult {
    /// The degraded result `generate` returns on failure.
    pub fn from_error(err: &GenerationError) -> Self {
        Self {
            message: format!("I encountered an error: {err}. Let me try a different approach."),
            files: Vec::new(),
            reasoning: None,
        }
    }
}

pub struct GenerationClient {
    generator: Arc<dyn TextGenerator>,
    prompts: PromptManager,
    history_window: usize,
}

impl GenerationClient {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            prompts: PromptManager::new(),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// Number of most recent turns included in each prompt.
    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    pub fn prompts(&self) -> &PromptManager {
        &self.prompts
    }

    /// Renders the prompt for a chat turn, trimming history to the window.
    pub fn build_prompt(
        &self,
        prompt: &str,
        history: &[ConversationTurn],
        extra_think_mode: bool,
    ) -> Result<String, GenerationError> {
        let start = history.len().saturating_sub(self.history_window);
        self.prompts
            .render_chat(prompt, &history[start..], extra_think_mode)
    }

    /// Fail-fast generation.
    pub async fn try_generate(
        &self,
        prompt: &str,
        history: &[ConversationTurn],
        options: &GenerationOptions,
    ) -> Result<GenerationResult, GenerationError> {
        let full_prompt = self.build_prompt(prompt, history, options.extra_think_mode)?;
        let mode = TaskMode::classify(prompt, options.extra_think_mode);
        tracing::debug!(
            "[Generation] {} request via {} ({} history turns)",
            mode,
            self.generator.name(),
            history.len().min(self.history_window)
        );

        let request = CompletionRequest::new(full_prompt, mode.sampling()).with_user_input(prompt);
        let raw = self.complete(request, &options.cancel).await?;

        let parsed = parse_response(&raw);
        let reasoning = if options.extra_think_mode {
            extract_reasoning(&raw)
        } else {
            None
        };
        tracing::info!(
            "[Generation] Completed: {} files, {} chars",
            parsed.files.len(),
            raw.len()
        );

        Ok(GenerationResult {
            message: parsed.message,
            files: parsed.files,
            reasoning,
        })
    }

    /// Generation that degrades to an error message instead of failing.
    pub async fn generate(
        &self,
        prompt: &str,
        history: &[ConversationTurn],
        options: &GenerationOptions,
    ) -> GenerationResult {
        match self.try_generate(prompt, history, options).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!("[Generation] {}", err);
                GenerationResult::from_error(&err)
            }
        }
    }

    /// Asks for a fix of a runtime error, with the current files as context.
    pub async fn fix_errors(
        &self,
        error_text: &str,
        files: &[FileRecord],
        history: &[ConversationTurn],
        options: &GenerationOptions,
    ) -> GenerationResult {
        match self.prompts.render_fix(error_text, &render_file_blocks(files)) {
            Ok(fix_prompt) => self.generate(&fix_prompt, history, options).await,
            Err(err) => {
                tracing::error!("[Generation] {}", err);
                GenerationResult::from_error(&err)
            }
        }
    }

    /// Runs one backend call, racing it against the cancellation token.
    pub async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            result = self.generator.complete(request) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<String, GenerationError>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl Scripted {
        fn new(reply: Result<&str, GenerationError>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
            self.seen.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn turns(n: usize) -> Vec<ConversationTurn> {
        (0..n)
            .map(|i| ConversationTurn::new("User", format!("turn-{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_generate_parses_files() {
        let backend = Scripted::new(Ok("Here!\n\n### FILE: index.html\n```html\n<p>hi</p>\n```"));
        let client = GenerationClient::new(backend.clone());

        let result = client
            .generate("Build a page", &[], &GenerationOptions::default())
            .await;

        assert_eq!(result.message, "Here!");
        assert_eq!(result.files.len(), 1);
        assert!(result.reasoning.is_none());

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].user_input.as_deref(), Some("Build a page"));
        assert_eq!(seen[0].sampling, TaskMode::Coding.sampling());
    }

    #[tokio::test]
    async fn test_generate_degrades_on_error() {
        let backend = Scripted::new(Err(GenerationError::Http {
            status: 500,
            message: "boom".into(),
        }));
        let client = GenerationClient::new(backend);

        let result = client
            .generate("Build a page", &[], &GenerationOptions::default())
            .await;

        assert!(result.files.is_empty());
        assert!(result.message.starts_with("I encountered an error: "));
        assert!(result.message.contains("500"));
        assert!(result.message.ends_with("Let me try a different approach."));
    }

    #[tokio::test]
    async fn test_history_is_windowed() {
        let backend = Scripted::new(Ok("ok"));
        let client = GenerationClient::new(backend.clone()).with_history_window(2);

        client
            .generate("next", &turns(5), &GenerationOptions::default())
            .await;

        let prompt = backend.seen.lock().unwrap()[0].prompt.clone();
        assert!(!prompt.contains("turn-2"));
        assert!(prompt.contains("turn-3"));
        assert!(prompt.contains("turn-4"));
    }

    #[tokio::test]
    async fn test_think_mode_extracts_reasoning() {
        let backend = Scripted::new(Ok(
            "## Thinking\nA counter needs state, an increment handler and a render step.\n\n### FILE: index.html\n```html\n<p>0</p>\n```",
        ));
        let client = GenerationClient::new(backend.clone());

        let result = client
            .generate("make a counter", &[], &GenerationOptions::new(true))
            .await;

        assert!(result.reasoning.unwrap().starts_with("A counter needs state"));
        let seen = backend.seen.lock().unwrap();
        assert!(seen[0].prompt.contains("DEEP REASONING MODE"));
        assert_eq!(seen[0].sampling, TaskMode::Reasoning.sampling());
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let backend = Scripted::new(Ok("ok"));
        let client = GenerationClient::new(backend.clone());
        let options = GenerationOptions::default();
        options.cancel.cancel();

        let err = client.try_generate("hi", &[], &options).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fix_errors_sends_files_and_error() {
        let backend = Scripted::new(Ok("### FILE: script.js\n```js\nfixed();\n```"));
        let client = GenerationClient::new(backend.clone());
        let files = vec![FileRecord::inferred("script.js", "broken(")];

        let result = client
            .fix_errors(
                "SyntaxError: missing )",
                &files,
                &[],
                &GenerationOptions::default(),
            )
            .await;

        assert_eq!(result.files[0].content, "fixed();");
        let prompt = backend.seen.lock().unwrap()[0].prompt.clone();
        assert!(prompt.contains("ERROR: SyntaxError: missing )"));
        assert!(prompt.contains("### FILE: script.js\n```javascript\nbroken(\n```"));
    }
}
