//! Session bootstrap shared by the subcommands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use kiln_application::BuilderSession;
use kiln_core::build::BuildProgress;
use kiln_core::config::KilnConfig;
use kiln_core::preview::ViewMode;
use kiln_execution::{FileSurface, PreviewRenderer};
use kiln_interaction::{GeminiApiClient, OfflineGenerator, SecretStorage, TextGenerator};

use crate::GlobalArgs;

pub struct AppContext {
    pub session: BuilderSession,
    pub project: PathBuf,
    preview: Option<PreviewRenderer<FileSurface>>,
}

impl AppContext {
    /// Loads config, picks a backend and restores the saved project, if any.
    pub fn open(args: &GlobalArgs) -> Result<Self> {
        let config = load_config()?;
        let generator = select_generator(args, &config)?;
        Self::open_with(args, &config, generator, |session| session)
    }

    /// Like [`AppContext::open`], printing build log lines as they appear.
    pub fn open_with_build_log(args: &GlobalArgs) -> Result<Self> {
        let config = load_config()?;
        let generator = select_generator(args, &config)?;
        Self::open_with(args, &config, generator, |session| {
            let printed = AtomicUsize::new(0);
            session.with_progress_observer(move |progress: &BuildProgress| {
                let seen = printed.swap(progress.logs.len(), Ordering::AcqRel);
                for line in progress.logs.iter().skip(seen.min(progress.logs.len())) {
                    crate::commands::print_log_line(line);
                }
            })
        })
    }

    /// Restores the saved project for commands that never call the model.
    ///
    /// No API key is needed; the session is wired to the offline generator.
    pub fn open_local(args: &GlobalArgs) -> Result<Self> {
        let config = load_config()?;
        Self::open_with(args, &config, Arc::new(OfflineGenerator::new()), |session| {
            session
        })
    }

    fn open_with(
        args: &GlobalArgs,
        config: &KilnConfig,
        generator: Arc<dyn TextGenerator>,
        configure: impl FnOnce(BuilderSession) -> BuilderSession,
    ) -> Result<Self> {
        let session = configure(BuilderSession::from_config(config, generator));

        if args.think {
            session.store().set_extra_think_mode(true);
        }
        if args.project.exists() {
            let count = session
                .import(&args.project)
                .with_context(|| format!("Failed to load project {}", args.project.display()))?;
            tracing::debug!("[CLI] Loaded {} files from {}", count, args.project.display());
        }

        Ok(Self {
            session,
            project: args.project.clone(),
            preview: None,
        })
    }

    pub fn save(&self) -> Result<()> {
        self.session
            .export(&self.project)
            .with_context(|| format!("Failed to save project {}", self.project.display()))
    }

    /// View mode of the last preview written, if any.
    pub fn preview_view(&self) -> Option<ViewMode> {
        self.preview.as_ref().map(|r| r.surface().view_mode())
    }

    /// Writes the preview page to `out`.
    ///
    /// The renderer is kept between calls, so an unchanged project in the
    /// same view is not rewritten. Returns whether the file was written.
    pub fn render_preview(&mut self, view: ViewMode, out: &Path) -> Result<bool> {
        if self
            .preview
            .as_ref()
            .is_some_and(|r| r.surface().path() != out)
        {
            self.preview = None;
        }
        let renderer = self
            .preview
            .get_or_insert_with(|| PreviewRenderer::new(FileSurface::new(out, view)));
        if renderer.surface().view_mode() != view {
            renderer.surface_mut().set_view_mode(view);
            renderer.invalidate();
        }
        Ok(renderer.sync(self.session.store())?)
    }
}

fn load_config() -> Result<KilnConfig> {
    KilnConfig::load().context("Failed to load configuration")
}

fn select_generator(args: &GlobalArgs, config: &KilnConfig) -> Result<Arc<dyn TextGenerator>> {
    if args.offline {
        tracing::info!("[CLI] Using offline templates");
        return Ok(Arc::new(OfflineGenerator::new()));
    }

    let storage = SecretStorage::new()?;
    let api_key = storage.resolve_api_key().with_context(|| {
        format!(
            "No Gemini API key found. Set GEMINI_API_KEY, add it to {}, or run with --offline",
            storage.path().display()
        )
    })?;
    tracing::info!("[CLI] Using Gemini model {}", config.gemini.model);
    Ok(Arc::new(GeminiApiClient::from_settings(api_key, &config.gemini)))
}
