//! Build phases and the progress record observers receive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered phases of an orchestrated build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    #[default]
    Initializing,
    Planning,
    Architecture,
    Frontend,
    Backend,
    BuildCompile,
    Testing,
    Debug,
    Optimize,
    Integrate,
    Completed,
    Failed,
}

impl BuildPhase {
    /// Progress percentage reached on entering the phase.
    ///
    /// `Failed` has none: a failing build keeps whatever progress it had.
    pub fn progress(self) -> Option<u8> {
        match self {
            Self::Initializing => Some(0),
            Self::Planning => Some(5),
            Self::Architecture => Some(15),
            Self::Frontend => Some(30),
            Self::Backend => Some(45),
            Self::BuildCompile => Some(60),
            Self::Testing => Some(75),
            Self::Debug => Some(85),
            Self::Optimize => Some(95),
            Self::Integrate => Some(99),
            Self::Completed => Some(100),
            Self::Failed => None,
        }
    }

    /// Human-readable stage label.
    pub fn stage(self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Planning => "Planning Architecture",
            Self::Architecture => "Setting Up Architecture",
            Self::Frontend => "Building Frontend",
            Self::Backend => "Building Backend",
            Self::BuildCompile => "Compiling Builds",
            Self::Testing => "Testing & Validation",
            Self::Debug => "Auto-Fixing Errors",
            Self::Optimize => "Optimizing Performance",
            Self::Integrate => "Final Integration",
            Self::Completed => "Completed ✅",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stage())
    }
}

/// Snapshot of a running build, as published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProgress {
    pub stage: String,
    pub phase: BuildPhase,
    /// 0..=100, never decreases within one build.
    pub progress: u8,
    /// Timestamped, append-only.
    pub logs: Vec<String>,
    pub active_ais: usize,
    pub completed_tasks: usize,
    pub total_tasks: usize,
}

impl Default for BuildProgress {
    fn default() -> Self {
        Self {
            stage: BuildPhase::Initializing.stage().to_string(),
            phase: BuildPhase::Initializing,
            progress: 0,
            logs: Vec::new(),
            active_ais: 0,
            completed_tasks: 0,
            total_tasks: 0,
        }
    }
}

impl BuildProgress {
    /// Enters `phase`, raising progress to the phase's percentage.
    pub fn enter(&mut self, phase: BuildPhase) {
        self.phase = phase;
        self.stage = phase.stage().to_string();
        if let Some(target) = phase.progress() {
            self.progress = self.progress.max(target);
        }
    }

    /// Appends a log line prefixed with the local wall-clock time.
    pub fn log(&mut self, message: impl AsRef<str>) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        self.logs.push(format!("[{}] {}", timestamp, message.as_ref()));
    }
}
