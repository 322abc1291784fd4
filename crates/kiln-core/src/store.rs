//! Project state store.
//!
//! `ProjectStore` is the single owner of [`ProjectState`]. Every command is
//! synchronous and applied as one `send_modify` on a `watch` channel, so a
//! subscriber never observes a half-applied transition.

use tokio::sync::watch;

use crate::file::{FileRecord, FileSet};
use crate::message::{ConversationTurn, Message, MessageRole};
use crate::state::ProjectState;

/// Command API over the project aggregate.
///
/// Construct one per application root and share it by `Arc`.
#[derive(Debug)]
pub struct ProjectStore {
    state: watch::Sender<ProjectState>,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectStore {
    /// Creates a store holding a fresh project.
    pub fn new() -> Self {
        Self::with_state(ProjectState::default())
    }

    /// Creates a store around an existing state (e.g. an imported project).
    pub fn with_state(state: ProjectState) -> Self {
        let (sender, _) = watch::channel(state);
        Self { state: sender }
    }

    /// Observers are woken after every committed command.
    pub fn subscribe(&self) -> watch::Receiver<ProjectState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ProjectState {
        self.state.borrow().clone()
    }

    fn read<R>(&self, f: impl FnOnce(&ProjectState) -> R) -> R {
        f(&self.state.borrow())
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Appends a message and returns its id.
    pub fn add_message(
        &self,
        content: impl Into<String>,
        role: MessageRole,
        files: Option<Vec<FileRecord>>,
    ) -> u64 {
        let content = content.into();
        let mut id = 0;
        self.state.send_modify(|state| {
            id = state.next_message_id;
            state.next_message_id += 1;
            state.messages.push(Message {
                id,
                role,
                content,
                timestamp: chrono::Utc::now().timestamp_millis(),
                files,
            });
        });
        id
    }

    /// Replaces the whole file set.
    pub fn set_files(&self, files: Vec<FileRecord>) {
        let files = FileSet::from_records(files);
        self.state.send_modify(|state| {
            state.files = files;
            state.preview_generation += 1;
            state.repair_active_file();
        });
    }

    /// Replaces the content of one file. Unknown names leave the files alone
    /// but still invalidate the preview.
    pub fn update_file(&self, name: &str, content: impl Into<String>) {
        let content = content.into();
        self.state.send_modify(|state| {
            if !state.files.update_content(name, content) {
                tracing::debug!("[Store] update_file ignored unknown file: {}", name);
            }
            state.preview_generation += 1;
        });
    }

    /// Inserts a file (replacing one of the same name), moves it to the end
    /// of the tab order and makes it active.
    pub fn create_new_file(&self, record: FileRecord) {
        self.state.send_modify(|state| {
            state.active_file = Some(record.name.clone());
            state.files.push_back(record);
            state.preview_generation += 1;
        });
    }

    pub fn set_active_file(&self, name: impl Into<String>) {
        let name = name.into();
        self.state.send_modify(|state| state.active_file = Some(name));
    }

    pub fn toggle_code_editor(&self) {
        self.state
            .send_modify(|state| state.ui.show_editor = !state.ui.show_editor);
    }

    pub fn set_extra_think_mode(&self, enabled: bool) {
        self.state
            .send_modify(|state| state.ui.extra_think_mode = enabled);
    }

    pub fn set_last_error(&self, error: Option<String>) {
        self.state
            .send_modify(|state| state.last_runtime_error = error);
    }

    pub fn set_is_generating(&self, generating: bool) {
        self.state
            .send_modify(|state| state.is_generating = generating);
    }

    /// Atomically claims the generation slot.
    ///
    /// Returns false when a generation is already in flight.
    pub fn try_begin_generation(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_generating {
                false
            } else {
                state.is_generating = true;
                true
            }
        })
    }

    /// Forces a fresh preview write without touching files.
    pub fn refresh_preview(&self) {
        self.state
            .send_modify(|state| state.preview_generation += 1);
    }

    /// Resets the project to its initial content.
    ///
    /// The preview generation keeps counting upwards and the epoch advances,
    /// so in-flight work can tell that the project it started on is gone.
    pub fn clear_project(&self) {
        self.state.send_modify(|state| {
            let generation = state.preview_generation + 1;
            let epoch = state.epoch + 1;
            let next_message_id = state.next_message_id;
            *state = ProjectState {
                preview_generation: generation,
                epoch,
                next_message_id,
                ..ProjectState::default()
            };
        });
    }

    // ------------------------------------------------------------------
    // Read views
    // ------------------------------------------------------------------

    /// Transcript rendered for prompt construction.
    pub fn conversation_history(&self) -> Vec<ConversationTurn> {
        self.read(|state| state.history().collect())
    }

    pub fn messages(&self) -> Vec<Message> {
        self.read(|state| state.messages.clone())
    }

    pub fn files(&self) -> Vec<FileRecord> {
        self.read(|state| state.files.to_vec())
    }

    pub fn file(&self, name: &str) -> Option<FileRecord> {
        self.read(|state| state.files.get(name).cloned())
    }

    /// The active file after fallback resolution.
    pub fn active_file(&self) -> Option<FileRecord> {
        self.read(|state| state.resolved_active_file().cloned())
    }

    pub fn preview_generation(&self) -> u64 {
        self.read(|state| state.preview_generation)
    }

    pub fn last_error(&self) -> Option<String> {
        self.read(|state| state.last_runtime_error.clone())
    }

    pub fn is_generating(&self) -> bool {
        self.read(|state| state.is_generating)
    }

    pub fn extra_think_mode(&self) -> bool {
        self.read(|state| state.ui.extra_think_mode)
    }

    pub fn show_editor(&self) -> bool {
        self.read(|state| state.ui.show_editor)
    }

    pub fn epoch(&self) -> u64 {
        self.read(|state| state.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Language;

    fn html(name: &str, content: &str) -> FileRecord {
        FileRecord::new(name, Language::Html, content)
    }

    #[test]
    fn test_new_store_has_placeholder() {
        let store = ProjectStore::new();
        let files = store.files();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "index.html");
        assert_eq!(store.active_file().unwrap().name, "index.html");
        assert!(store.show_editor());
        assert!(!store.extra_think_mode());
        assert_eq!(store.preview_generation(), 0);
    }

    #[test]
    fn test_add_message_ids_are_monotonic() {
        let store = ProjectStore::new();
        let first = store.add_message("hi", MessageRole::User, None);
        let second = store.add_message("hello", MessageRole::Assistant, None);

        assert!(second > first);
        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert!(messages[0].timestamp > 0);
    }

    #[test]
    fn test_every_file_mutation_bumps_generation() {
        let store = ProjectStore::new();
        let mut last = store.preview_generation();

        store.set_files(vec![html("index.html", "a")]);
        assert!(store.preview_generation() > last);
        last = store.preview_generation();

        store.update_file("index.html", "b");
        assert!(store.preview_generation() > last);
        last = store.preview_generation();

        store.update_file("missing.js", "c");
        assert!(store.preview_generation() > last);
        last = store.preview_generation();

        store.create_new_file(html("about.html", "d"));
        assert!(store.preview_generation() > last);
    }

    #[test]
    fn test_update_file_unknown_name_is_noop_for_content() {
        let store = ProjectStore::new();
        let before = store.files();
        store.update_file("ghost.css", "body {}");
        assert_eq!(store.files(), before);
    }

    #[test]
    fn test_set_files_empty_clears_active_reference() {
        let store = ProjectStore::new();
        store.set_files(vec![]);

        assert!(store.active_file().is_none());
        assert!(store.snapshot().active_file.is_none());
    }

    #[test]
    fn test_set_files_single_file_becomes_active() {
        let store = ProjectStore::new();
        store.set_files(vec![FileRecord::inferred("app.html", "<p>")]);

        assert_eq!(store.active_file().unwrap().name, "app.html");
    }

    #[test]
    fn test_set_files_keeps_valid_active_reference() {
        let store = ProjectStore::new();
        store.set_files(vec![
            FileRecord::inferred("index.html", ""),
            FileRecord::inferred("script.js", ""),
        ]);
        store.set_active_file("script.js");
        store.set_files(vec![
            FileRecord::inferred("index.html", "x"),
            FileRecord::inferred("script.js", "y"),
        ]);

        assert_eq!(store.active_file().unwrap().name, "script.js");
    }

    #[test]
    fn test_create_new_file_replaces_and_activates() {
        let store = ProjectStore::new();
        store.create_new_file(html("index.html", "replaced"));

        let files = store.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "replaced");
        assert_eq!(store.active_file().unwrap().content, "replaced");
    }

    #[test]
    fn test_try_begin_generation_gates() {
        let store = ProjectStore::new();
        assert!(store.try_begin_generation());
        assert!(!store.try_begin_generation());
        store.set_is_generating(false);
        assert!(store.try_begin_generation());
    }

    #[test]
    fn test_clear_project_resets_but_stays_monotonic() {
        let store = ProjectStore::new();
        store.add_message("hi", MessageRole::User, None);
        store.set_files(vec![html("a.html", "")]);
        store.set_last_error(Some("boom".into()));
        store.set_extra_think_mode(true);
        store.toggle_code_editor();
        let generation = store.preview_generation();
        let epoch = store.epoch();

        store.clear_project();

        let state = store.snapshot();
        assert!(state.messages.is_empty());
        assert_eq!(state.files.len(), 1);
        assert!(state.files.contains("index.html"));
        assert!(state.last_runtime_error.is_none());
        assert!(!state.ui.extra_think_mode);
        assert!(state.ui.show_editor);
        assert!(state.preview_generation > generation);
        assert_eq!(state.epoch, epoch + 1);
    }

    #[test]
    fn test_conversation_history_labels() {
        let store = ProjectStore::new();
        store.add_message("Build a todo app", MessageRole::User, None);
        store.add_message("Done", MessageRole::Assistant, None);

        let history = store.conversation_history();
        assert_eq!(history[0], ConversationTurn::new("User", "Build a todo app"));
        assert_eq!(history[1], ConversationTurn::new("Assistant", "Done"));
    }

    #[test]
    fn test_history_iterator_is_restartable() {
        let store = ProjectStore::new();
        store.add_message("one", MessageRole::User, None);
        let state = store.snapshot();

        let iter = state.history();
        assert_eq!(iter.clone().count(), 1);
        assert_eq!(iter.count(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_committed_state() {
        let store = ProjectStore::new();
        let mut rx = store.subscribe();

        store.set_files(vec![html("index.html", "new")]);

        rx.changed().await.unwrap();
        let state = rx.borrow_and_update();
        assert_eq!(state.files.get("index.html").unwrap().content, "new");
        assert_eq!(state.preview_generation, 1);
    }
}
