//! Automatic repair of preview runtime errors.

use std::sync::atomic::{AtomicBool, Ordering};

use kiln_core::file::FileRecord;
use kiln_core::{MessageRole, ProjectStore};
use kiln_interaction::{GenerationClient, GenerationOptions};

/// What a fix attempt amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    /// Files were replaced and the error cleared.
    Fixed {
        message: String,
        files: Vec<FileRecord>,
    },
    /// The model answered without usable files; the error is kept.
    NotFixed { message: String },
    /// Nothing to fix.
    NoError,
    /// Another fix is still running.
    AlreadyRunning,
}

/// Single-flight fixer: at most one repair request is in the air.
#[derive(Debug, Default)]
pub struct AutoFixer {
    fixing: AtomicBool,
}

/// Releases the fixing flag however the attempt ends.
struct FixingGuard<'a>(&'a AtomicBool);

impl Drop for FixingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AutoFixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fixing(&self) -> bool {
        self.fixing.load(Ordering::Acquire)
    }

    /// Sends the store's last runtime error plus the current files to the
    /// model and applies the returned files.
    ///
    /// A result that arrives after the project was cleared is dropped.
    pub async fn run(
        &self,
        store: &ProjectStore,
        client: &GenerationClient,
        options: &GenerationOptions,
    ) -> FixOutcome {
        let Some(error) = store.last_error() else {
            return FixOutcome::NoError;
        };

        if self
            .fixing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("[AutoFix] Fix already in progress, skipping");
            return FixOutcome::AlreadyRunning;
        }
        let _guard = FixingGuard(&self.fixing);

        tracing::info!("[AutoFix] Attempting fix for: {}", first_line(&error));
        let epoch = store.epoch();
        let files = store.files();
        let history = store.conversation_history();

        let result = client.fix_errors(&error, &files, &history, options).await;

        if store.epoch() != epoch {
            tracing::info!("[AutoFix] Project was cleared during the fix, discarding result");
            return FixOutcome::NotFixed {
                message: result.message,
            };
        }

        if result.files.is_empty() {
            tracing::warn!("[AutoFix] Fix returned no files; keeping the error");
            return FixOutcome::NotFixed {
                message: result.message,
            };
        }

        let message = format!("Fixed the error: {}", result.message);
        store.add_message(message.clone(), MessageRole::Assistant, Some(result.files.clone()));
        store.set_files(result.files.clone());
        store.set_last_error(None);
        tracing::info!("[AutoFix] Applied {} fixed files", result.files.len());

        FixOutcome::Fixed {
            message,
            files: result.files,
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}
