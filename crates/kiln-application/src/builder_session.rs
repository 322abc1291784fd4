//! Builder session use cases.
//!
//! A [`BuilderSession`] owns one project. Chat turns and builds share the
//! store's generation gate, so only one of them runs at a time. Every piece
//! of remote work runs under a child of the session's root cancellation
//! token; clearing the project cancels the root, and any completion that
//! still arrives for the old project is discarded by comparing epochs.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use kiln_core::build::{BuildOutput, BuildProgress, PlatformTarget};
use kiln_core::config::KilnConfig;
use kiln_core::export::{load_project, save_project};
use kiln_core::preview::PreviewMessage;
use kiln_core::quality::{QualityCheck, analyze};
use kiln_core::{FileRecord, GenerationError, KilnError, MessageRole, ProjectStore, Result};
use kiln_execution::{AutoFixer, BuildOrchestrator, FixOutcome};
use kiln_interaction::{GenerationClient, GenerationOptions, GenerationResult, TextGenerator};
use tokio_util::sync::CancellationToken;

/// Result of one chat turn as seen by a front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    /// Id of the assistant message that was appended.
    pub message_id: u64,
    pub result: GenerationResult,
}

/// Holds the generation gate for one operation.
///
/// Releases it on drop unless the project was cleared in the meantime, in
/// which case the reset already released it and a newer operation may own it.
struct InFlight<'a> {
    store: &'a ProjectStore,
    epoch: u64,
    cancel: CancellationToken,
}

impl InFlight<'_> {
    fn is_current(&self) -> bool {
        self.store.epoch() == self.epoch
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.is_current() {
            self.store.set_is_generating(false);
        }
    }
}

pub struct BuilderSession {
    store: Arc<ProjectStore>,
    client: Arc<GenerationClient>,
    orchestrator: BuildOrchestrator,
    fixer: AutoFixer,
    root_cancel: Mutex<CancellationToken>,
}

impl BuilderSession {
    pub fn new(
        store: Arc<ProjectStore>,
        client: Arc<GenerationClient>,
        orchestrator: BuildOrchestrator,
    ) -> Self {
        Self {
            store,
            client,
            orchestrator,
            fixer: AutoFixer::new(),
            root_cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Wires a fresh project to `generator` using the loaded configuration.
    pub fn from_config(config: &KilnConfig, generator: Arc<dyn TextGenerator>) -> Self {
        let client = Arc::new(
            GenerationClient::new(generator).with_history_window(config.generation.history_window),
        );
        let orchestrator = BuildOrchestrator::new(Arc::clone(&client), config.orchestrator.roster())
            .with_max_context_chars(config.orchestrator.max_context_chars);

        let store = Arc::new(ProjectStore::new());
        store.set_extra_think_mode(config.generation.think_mode_default);

        Self::new(store, client, orchestrator)
    }

    pub fn with_progress_observer(
        self,
        observer: impl Fn(&BuildProgress) + Send + Sync + 'static,
    ) -> Self {
        Self {
            orchestrator: self.orchestrator.with_progress_observer(observer),
            ..self
        }
    }

    pub fn store(&self) -> &Arc<ProjectStore> {
        &self.store
    }

    pub fn client(&self) -> &Arc<GenerationClient> {
        &self.client
    }

    pub fn orchestrator(&self) -> &BuildOrchestrator {
        &self.orchestrator
    }

    /// Sends a chat turn and applies the parsed files.
    ///
    /// Generation failures do not fail the turn: they come back as an
    /// apologetic assistant message. The assistant message is appended
    /// before the files are replaced.
    pub async fn submit(&self, prompt: &str) -> Result<ChatOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(KilnError::EmptyPrompt);
        }
        let flight = self.begin()?;

        let history = self.store.conversation_history();
        self.store.add_message(prompt, MessageRole::User, None);

        let options = GenerationOptions::new(self.store.extra_think_mode())
            .with_cancel(flight.cancel.clone());
        let result = match self.client.try_generate(prompt, &history, &options).await {
            Ok(result) => result,
            Err(GenerationError::Cancelled) => return Err(KilnError::Cancelled),
            Err(err) => {
                tracing::error!("[Session] Generation failed: {}", err);
                GenerationResult::from_error(&err)
            }
        };

        if !flight.is_current() {
            tracing::info!("[Session] Project was cleared, discarding chat result");
            return Err(KilnError::Cancelled);
        }

        let files = (!result.files.is_empty()).then(|| result.files.clone());
        let message_id = self
            .store
            .add_message(result.message.clone(), MessageRole::Assistant, files.clone());
        if let Some(files) = files {
            self.store.set_files(files);
        }

        Ok(ChatOutcome { message_id, result })
    }

    /// Runs the multi-agent build and loads the first platform's files.
    ///
    /// A failed build leaves the files untouched and appends an assistant
    /// message pointing at the single-call chat path.
    pub async fn build_app(
        &self,
        request: &str,
        target: PlatformTarget,
    ) -> Result<Vec<BuildOutput>> {
        let request = request.trim();
        if request.is_empty() {
            return Err(KilnError::EmptyPrompt);
        }
        let flight = self.begin()?;
        self.store.add_message(request, MessageRole::User, None);

        let outcome = self
            .orchestrator
            .build_app(request, target, &flight.cancel)
            .await;

        if !flight.is_current() {
            tracing::info!("[Session] Project was cleared, discarding build result");
            return Err(KilnError::Cancelled);
        }

        match outcome {
            Ok(outputs) => {
                let files = outputs
                    .first()
                    .map(|output| output.files.clone())
                    .unwrap_or_default();
                self.store.add_message(
                    format!(
                        "Your app is ready for {target}! The AI team produced {} files.",
                        files.len()
                    ),
                    MessageRole::Assistant,
                    Some(files.clone()),
                );
                self.store.set_files(files);
                Ok(outputs)
            }
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                self.store.add_message(
                    format!(
                        "The build failed: {err}. Try describing your app in the chat instead; a single generation often gets there."
                    ),
                    MessageRole::Assistant,
                    None,
                );
                Err(err)
            }
        }
    }

    /// Asks the model to repair the last runtime error.
    pub async fn auto_fix(&self) -> FixOutcome {
        let options = GenerationOptions::new(self.store.extra_think_mode())
            .with_cancel(self.lock_root().child_token());
        self.fixer.run(&self.store, &self.client, &options).await
    }

    /// Takes a payload posted by the preview frame.
    ///
    /// Returns true when it was a runtime error and has been recorded.
    pub fn receive_preview_message(&self, payload: &serde_json::Value) -> bool {
        match PreviewMessage::from_json(payload) {
            Some(PreviewMessage::Error(error)) => {
                tracing::debug!("[Session] Preview reported: {}", error.message);
                self.store.set_last_error(Some(error.to_error_text()));
                true
            }
            None => false,
        }
    }

    /// Cancels in-flight work and resets the project.
    pub fn clear_project(&self) {
        self.orchestrator.reset();
        {
            let mut root = self.lock_root();
            root.cancel();
            *root = CancellationToken::new();
        }
        self.store.clear_project();
        tracing::info!("[Session] Project cleared");
    }

    /// Adds a hand-made file and makes it active.
    pub fn create_file(&self, name: &str, content: impl Into<String>) -> Result<()> {
        let record = FileRecord::new_validated(name, content)?;
        self.store.create_new_file(record);
        Ok(())
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        save_project(path, &self.store.files())
    }

    /// Replaces the project's files with those saved at `path`.
    pub fn import(&self, path: &Path) -> Result<usize> {
        let files = load_project(path)?;
        let count = files.len();
        self.store.set_files(files);
        Ok(count)
    }

    pub fn quality(&self) -> Vec<QualityCheck> {
        analyze(&self.store.files())
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        if !self.store.try_begin_generation() {
            return Err(KilnError::Busy);
        }
        Ok(InFlight {
            store: &self.store,
            epoch: self.store.epoch(),
            cancel: self.lock_root().child_token(),
        })
    }

    fn lock_root(&self) -> MutexGuard<'_, CancellationToken> {
        self.root_cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
