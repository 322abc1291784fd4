use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kiln_application::BuilderSession;
use kiln_core::build::PlatformTarget;
use kiln_core::config::KilnConfig;
use kiln_core::preview::ViewMode;
use kiln_core::{GenerationError, KilnError, Language, MessageRole};
use kiln_execution::{FileSurface, FixOutcome, PreviewRenderer};
use kiln_interaction::{CompletionRequest, OfflineGenerator, TextGenerator};
use serde_json::json;
use tokio::sync::Notify;

const TODO_REPLY: &str = "Here's your todo app!\n\n### FILE: index.html\n```html\n<!DOCTYPE html>\n<html><body><ul id=\"list\"></ul><script src=\"script.js\"></script></body></html>\n```\n\n### FILE: script.js\n```javascript\nconst todos = [];\n```";

const PAGE_REPLY: &str = "Here is your page!\n\n### FILE: index.html\n```html\n<h1>Hello</h1>\n```";

/// Scripted backend: optional gate, fixed reply, recorded prompts.
struct Stub {
    reply: Result<&'static str, GenerationError>,
    gate: Option<Arc<Notify>>,
    prompts: Mutex<Vec<String>>,
}

impl Stub {
    fn replying(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply),
            gate: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(err: GenerationError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            gate: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn gated(reply: &'static str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply),
            gate: Some(gate),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for Stub {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(request.prompt);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply.clone().map(str::to_string)
    }
}

fn session(generator: Arc<dyn TextGenerator>) -> Arc<BuilderSession> {
    Arc::new(BuilderSession::from_config(&KilnConfig::default(), generator))
}

async fn wait_until_generating(session: &BuilderSession) {
    while !session.store().is_generating() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_chat_turn_applies_files() {
    let session = session(Stub::replying(PAGE_REPLY));
    let generation = session.store().preview_generation();

    let outcome = session.submit("  Build a greeting page  ").await.unwrap();

    let messages = session.store().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].content, "Build a greeting page");
    assert_eq!(messages[1].id, outcome.message_id);
    assert_eq!(messages[1].content, "Here is your page!");
    assert_eq!(messages[1].files.as_ref().unwrap().len(), 1);

    assert_eq!(session.store().file("index.html").unwrap().content, "<h1>Hello</h1>");
    assert!(session.store().preview_generation() > generation);
    assert!(!session.store().is_generating());
}

#[tokio::test]
async fn test_todo_app_turn_replaces_files_in_one_step() {
    let session = session(Stub::replying(TODO_REPLY));
    let generation = session.store().preview_generation();

    let outcome = session.submit("Build a todo app").await.unwrap();

    assert_eq!(outcome.result.message, "Here's your todo app!");
    let files = session.store().files();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "index.html");
    assert_eq!(files[0].language, Language::Html);
    assert_eq!(files[1].name, "script.js");
    assert_eq!(files[1].language, Language::JavaScript);
    assert_eq!(files[1].content, "const todos = [];");
    assert_eq!(session.store().preview_generation(), generation + 1);
}

#[tokio::test]
async fn test_reply_without_files_keeps_files() {
    let session = session(Stub::replying("Sure, what colour scheme would you like?"));
    let before = session.store().files();
    let generation = session.store().preview_generation();

    session.submit("Make it pretty").await.unwrap();

    assert_eq!(session.store().files(), before);
    assert_eq!(session.store().preview_generation(), generation);
    assert!(session.store().messages()[1].files.is_none());
}

#[tokio::test]
async fn test_history_includes_earlier_turns_only() {
    let stub = Stub::replying(PAGE_REPLY);
    let session = session(stub.clone());

    session.submit("first request").await.unwrap();
    session.submit("second request").await.unwrap();

    let prompts = stub.prompts.lock().unwrap();
    assert!(!prompts[0].contains("Previous conversation:\nUser: first request"));
    assert!(prompts[1].contains(
        "Previous conversation:\nUser: first request\nAssistant: Here is your page!\n"
    ));
    assert_eq!(prompts[1].matches("second request").count(), 1);
}

#[tokio::test]
async fn test_empty_prompt_is_rejected() {
    let session = session(Stub::replying(PAGE_REPLY));

    let err = session.submit("   \n ").await.unwrap_err();

    assert_eq!(err, KilnError::EmptyPrompt);
    assert!(session.store().messages().is_empty());
}

#[tokio::test]
async fn test_generation_error_becomes_message() {
    let session = session(Stub::failing(GenerationError::Http {
        status: 503,
        message: "UNAVAILABLE: overloaded".into(),
    }));
    let before = session.store().files();

    let outcome = session.submit("Build a todo app").await.unwrap();

    assert!(outcome.result.message.starts_with("I encountered an error:"));
    assert_eq!(session.store().files(), before);
    assert_eq!(session.store().messages().len(), 2);
    assert!(!session.store().is_generating());
}

#[tokio::test]
async fn test_second_submission_is_busy() {
    let gate = Arc::new(Notify::new());
    let session = session(Stub::gated(PAGE_REPLY, gate.clone()));

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.submit("first").await })
    };
    wait_until_generating(&session).await;

    assert_eq!(session.submit("second").await.unwrap_err(), KilnError::Busy);
    assert_eq!(
        session
            .build_app("a build", PlatformTarget::Web)
            .await
            .unwrap_err(),
        KilnError::Busy
    );

    gate.notify_one();
    first.await.unwrap().unwrap();
    assert!(!session.store().is_generating());
}

#[tokio::test]
async fn test_clear_discards_in_flight_turn() {
    let gate = Arc::new(Notify::new());
    let session = session(Stub::gated(PAGE_REPLY, gate.clone()));

    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.submit("Build a page").await })
    };
    wait_until_generating(&session).await;

    session.clear_project();

    assert!(running.await.unwrap().unwrap_err().is_cancelled());
    assert!(session.store().messages().is_empty());
    assert!(!session.store().file("index.html").unwrap().content.contains("Hello"));
    assert!(!session.store().is_generating());

    // The gate is usable again and new work is not born cancelled.
    gate.notify_one();
    session.submit("Build a page").await.unwrap();
    assert_eq!(session.store().messages().len(), 2);
}

#[tokio::test]
async fn test_offline_build_loads_deliverable() {
    let session = session(Arc::new(OfflineGenerator::new()));

    let outputs = session
        .build_app("Build a todo app", PlatformTarget::Web)
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    let names: Vec<_> = session.store().files().into_iter().map(|f| f.name).collect();
    assert_eq!(names, ["index.html", "script.js"]);

    let last = session.store().messages().pop().unwrap();
    assert_eq!(last.role, MessageRole::Assistant);
    assert_eq!(last.content, "Your app is ready for web! The AI team produced 2 files.");
    assert_eq!(session.orchestrator().progress().progress, 100);
}

#[tokio::test]
async fn test_failed_build_suggests_chat() {
    let session = session(Stub::failing(GenerationError::EmptyCompletion));
    let before = session.store().files();

    let err = session
        .build_app("Build a todo app", PlatformTarget::Android)
        .await
        .unwrap_err();

    assert!(err.is_build());
    assert_eq!(session.store().files(), before);
    let last = session.store().messages().pop().unwrap();
    assert!(last.content.starts_with("The build failed:"));
    assert!(last.content.contains("chat"));
    assert!(!session.store().is_generating());
}

#[tokio::test]
async fn test_preview_errors_feed_auto_fix() {
    let session = session(Stub::replying(
        "Guarded the null element.\n\n### FILE: script.js\n```javascript\nconst el = document.querySelector('#app');\n```",
    ));

    assert!(!session.receive_preview_message(&json!({"type": "resize", "height": 10})));
    assert!(session.receive_preview_message(&json!({
        "type": "error",
        "message": "TypeError: el is null",
        "stack": "at script.js:1"
    })));
    assert_eq!(
        session.store().last_error().as_deref(),
        Some("TypeError: el is null\nat script.js:1")
    );

    let outcome = session.auto_fix().await;

    assert!(matches!(outcome, FixOutcome::Fixed { .. }));
    assert!(session.store().last_error().is_none());
    assert!(session.store().file("script.js").is_some());
}

#[tokio::test]
async fn test_preview_write_keeps_reported_error_for_fix() {
    let session = session(Stub::replying(
        "Declared x.\n\n### FILE: script.js\n```javascript\nconst x = 1;\n```",
    ));
    assert!(session.receive_preview_message(&json!({
        "type": "error",
        "message": "ReferenceError: x is not defined"
    })));
    let generation = session.store().preview_generation();

    let dir = tempfile::tempdir().unwrap();
    let mut renderer = PreviewRenderer::new(FileSurface::new(
        dir.path().join("preview.html"),
        ViewMode::Desktop,
    ));
    assert!(renderer.sync(session.store()).unwrap());

    assert_eq!(session.store().preview_generation(), generation);
    assert!(session.store().last_error().is_some());
    assert!(matches!(session.auto_fix().await, FixOutcome::Fixed { .. }));

    // The fix moved the generation; the next write starts a clean page.
    assert!(renderer.sync(session.store()).unwrap());
    assert!(session.store().last_error().is_none());
}

#[tokio::test]
async fn test_files_and_export() {
    let session = session(Stub::replying(PAGE_REPLY));

    assert!(matches!(
        session.create_file("  ", "x"),
        Err(KilnError::InvalidFileName(_))
    ));
    session.create_file("app.css", "body { margin: 0 }").unwrap();
    assert_eq!(session.store().active_file().unwrap().name, "app.css");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kiln-project.json");
    session.export(&path).unwrap();

    let other = BuilderSession::from_config(&KilnConfig::default(), Stub::replying(PAGE_REPLY));
    assert_eq!(other.import(&path).unwrap(), 2);
    assert_eq!(other.store().files(), session.store().files());
}
