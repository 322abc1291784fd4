//! Project aggregate root.

use serde::{Deserialize, Serialize};

use crate::file::{FileRecord, FileSet, Language};
use crate::message::{ConversationTurn, Message};

/// Content of the placeholder page shown before anything was generated.
pub const WELCOME_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Welcome</title>
  <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gradient-to-br from-purple-900 via-blue-900 to-indigo-900 min-h-screen flex items-center justify-center">
  <div class="text-center text-white">
    <h1 class="text-6xl font-bold mb-4 animate-pulse">AI Builder</h1>
    <p class="text-xl opacity-80">Start chatting to generate your app!</p>
  </div>
</body>
</html>"#;

/// Transient presentation flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiFlags {
    pub show_editor: bool,
    /// Adds the deeper-reasoning block to generation prompts.
    pub extra_think_mode: bool,
}

impl Default for UiFlags {
    fn default() -> Self {
        Self {
            show_editor: true,
            extra_think_mode: false,
        }
    }
}

/// Everything the builder knows about the current project.
///
/// Owned by [`crate::store::ProjectStore`]; other components only ever see
/// snapshots of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    pub messages: Vec<Message>,
    pub files: FileSet,
    /// Weak reference into `files`. Use [`ProjectState::resolved_active_file`]
    /// to read it.
    pub active_file: Option<String>,
    pub is_generating: bool,
    /// Bumped on every change to `files`; the preview re-renders when it moves.
    pub preview_generation: u64,
    pub last_runtime_error: Option<String>,
    pub ui: UiFlags,
    /// Bumped on every project reset. Work started under an older epoch must
    /// not write back.
    pub epoch: u64,
    pub(crate) next_message_id: u64,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            files: default_files(),
            active_file: Some("index.html".to_string()),
            is_generating: false,
            preview_generation: 0,
            last_runtime_error: None,
            ui: UiFlags::default(),
            epoch: 0,
            next_message_id: 1,
        }
    }
}

impl ProjectState {
    /// The active file, falling back to the first file when the stored name
    /// no longer resolves.
    pub fn resolved_active_file(&self) -> Option<&FileRecord> {
        self.active_file
            .as_deref()
            .and_then(|name| self.files.get(name))
            .or_else(|| self.files.first())
    }

    /// Lazy projection of the transcript into prompt history.
    ///
    /// The iterator is `Clone`, so it can be restarted without touching the
    /// underlying messages.
    pub fn history(&self) -> impl Iterator<Item = ConversationTurn> + Clone + '_ {
        self.messages.iter().map(ConversationTurn::from)
    }

    /// Re-points `active_file` at something that exists, or clears it.
    pub(crate) fn repair_active_file(&mut self) {
        let valid = self
            .active_file
            .as_deref()
            .is_some_and(|name| self.files.contains(name));
        if !valid {
            self.active_file = self.files.first().map(|f| f.name.clone());
        }
    }
}

/// The single placeholder page a fresh project starts with.
pub fn default_files() -> FileSet {
    FileSet::from_records(vec![FileRecord::new(
        "index.html",
        Language::Html,
        WELCOME_HTML,
    )])
}
