//! Long-running work on top of the generation client: the multi-agent build
//! orchestrator, the runtime-error auto-fixer and the preview renderer.

pub mod autofix;
pub mod orchestrator;
pub mod preview;

pub use autofix::{AutoFixer, FixOutcome};
pub use orchestrator::{BuildOrchestrator, ProgressObserver};
pub use preview::{FileSurface, PreviewRenderer, PreviewSurface};
