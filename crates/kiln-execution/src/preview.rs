//! Keeps a preview surface in step with the project store.

use std::path::{Path, PathBuf};

use kiln_core::preview::{ViewMode, compose_document, host_page};
use kiln_core::{KilnError, ProjectStore, Result};

/// Somewhere a composed preview document can be shown.
pub trait PreviewSurface {
    fn write(&mut self, document: &str) -> Result<()>;
}

/// Writes the host page (sandboxed frame around the document) to a file.
#[derive(Debug, Clone)]
pub struct FileSurface {
    path: PathBuf,
    view_mode: ViewMode,
}

impl FileSurface {
    pub fn new(path: impl Into<PathBuf>, view_mode: ViewMode) -> Self {
        Self {
            path: path.into(),
            view_mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        self.view_mode = view_mode;
    }
}

impl PreviewSurface for FileSurface {
    fn write(&mut self, document: &str) -> Result<()> {
        let page = host_page(document, self.view_mode);
        std::fs::write(&self.path, page).map_err(|e| {
            KilnError::io(format!("Failed to write preview {}: {}", self.path.display(), e))
        })?;
        tracing::debug!("[Preview] Wrote {}", self.path.display());
        Ok(())
    }
}

/// Rewrites the surface whenever the store's preview generation moves.
pub struct PreviewRenderer<S: PreviewSurface> {
    surface: S,
    last_generation: Option<u64>,
}

impl<S: PreviewSurface> PreviewRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            last_generation: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Forgets the last written generation so the next sync rewrites.
    pub fn invalidate(&mut self) {
        self.last_generation = None;
    }

    /// Writes a fresh document if the generation changed.
    ///
    /// Returns whether a write happened. When the write replaces a document
    /// this renderer showed before, the page starts over, so the store's last
    /// runtime error is cleared. A renderer's first write leaves any recorded
    /// error alone.
    pub fn sync(&mut self, store: &ProjectStore) -> Result<bool> {
        let state = store.snapshot();
        if self.last_generation == Some(state.preview_generation) {
            return Ok(false);
        }

        let document = compose_document(&state.files);
        self.surface.write(&document)?;
        let replaced = self.last_generation.is_some();
        self.last_generation = Some(state.preview_generation);
        if replaced && state.last_runtime_error.is_some() {
            tracing::debug!("[Preview] Generation moved, clearing runtime error");
            store.set_last_error(None);
        }
        Ok(true)
    }
}
