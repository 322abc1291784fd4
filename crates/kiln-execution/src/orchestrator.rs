//! BuildOrchestrator - the phased multi-agent build.
//!
//! A build walks a fixed sequence of phases. Each phase prompts one or more
//! roster agents through the same [`GenerationClient`]; agents inside a team
//! run concurrently and the phase waits for all of them before moving on.
//! The master agent plans the build, stays on it throughout, and produces the
//! final deliverable, which is parsed with the usual file-marker rules.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use kiln_core::build::{
    AgentDescriptor, AgentStatus, BuildOutput, BuildPhase, BuildProgress, BuildStatus,
    MASTER_AGENT_ID, Platform, PlatformTarget, Roster,
};
use kiln_core::config::DEFAULT_MAX_CONTEXT_CHARS;
use kiln_core::parser::parse_deliverable;
use kiln_core::task_mode::TaskMode;
use kiln_core::{GenerationError, KilnError, Result};
use kiln_interaction::{CompletionRequest, GenerationClient};
use tokio_util::sync::CancellationToken;

/// Receives a snapshot after every progress change.
pub type ProgressObserver = Arc<dyn Fn(&BuildProgress) + Send + Sync>;

/// Agents that take part in every build, excluding per-platform builders and
/// the conditional fix round.
const FIXED_PARTICIPANTS: usize = 15;

/// Agents added when the error detector reports problems.
const FIX_ROUND_PARTICIPANTS: usize = 2;

struct BuildState {
    /// Identifies the build that owns this state. Writes from any other run
    /// are dropped.
    run_id: u64,
    agents: Vec<AgentDescriptor>,
    progress: BuildProgress,
}

impl BuildState {
    fn fresh(roster: &Roster, run_id: u64) -> Self {
        Self {
            run_id,
            agents: roster.roles().iter().map(AgentDescriptor::from).collect(),
            progress: BuildProgress::default(),
        }
    }

    fn agent_mut(&mut self, id: u8) -> Option<&mut AgentDescriptor> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    fn recount(&mut self) {
        self.progress.active_ais = self.agents.iter().filter(|a| a.is_working()).count();
        self.progress.completed_tasks = self.agents.iter().filter(|a| a.is_completed()).count();
    }
}

/// Parameters shared by every agent call of one build.
struct Run<'a> {
    id: u64,
    request: &'a str,
    target: PlatformTarget,
    cancel: &'a CancellationToken,
}

pub struct BuildOrchestrator {
    client: Arc<GenerationClient>,
    roster: Roster,
    max_context_chars: usize,
    state: Mutex<BuildState>,
    observers: Vec<ProgressObserver>,
}

impl BuildOrchestrator {
    pub fn new(client: Arc<GenerationClient>, roster: Roster) -> Self {
        let state = BuildState::fresh(&roster, 0);
        Self {
            client,
            roster,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            state: Mutex::new(state),
            observers: Vec::new(),
        }
    }

    pub fn with_max_context_chars(mut self, chars: usize) -> Self {
        self.max_context_chars = chars;
        self
    }

    pub fn with_progress_observer(
        mut self,
        observer: impl Fn(&BuildProgress) + Send + Sync + 'static,
    ) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn progress(&self) -> BuildProgress {
        self.lock().progress.clone()
    }

    pub fn agents(&self) -> Vec<AgentDescriptor> {
        self.lock().agents.clone()
    }

    /// Returns every agent to idle and clears progress.
    ///
    /// A build still running when this is called can no longer touch the
    /// state; its remaining updates are discarded.
    pub fn reset(&self) {
        self.begin_run();
    }

    fn begin_run(&self) -> u64 {
        let run_id = {
            let mut state = self.lock();
            let run_id = state.run_id + 1;
            *state = BuildState::fresh(&self.roster, run_id);
            run_id
        };
        self.publish();
        run_id
    }

    /// Runs a full build for `request`.
    ///
    /// Fails fast: the first agent error aborts the build with
    /// [`KilnError::Build`]; cancellation yields [`KilnError::Cancelled`].
    pub async fn build_app(
        &self,
        request: &str,
        target: PlatformTarget,
        cancel: &CancellationToken,
    ) -> Result<Vec<BuildOutput>> {
        let run = Run {
            id: self.begin_run(),
            request,
            target,
            cancel,
        };
        let platforms = target.platforms();
        self.update(&run, |p| {
            p.total_tasks = FIXED_PARTICIPANTS + platforms.len();
            p.log("🚀 Starting AI orchestration...");
            p.log(format!("📋 User Request: {request}"));
            p.log(format!("🎯 Target Platform(s): {target}"));
        });
        tracing::info!("[Orchestrator] Build started for {} ({})", target, request);

        match self.run_phases(&run, &platforms).await {
            Ok(outputs) => Ok(outputs),
            Err(err) => {
                self.update(&run, |p| {
                    p.log(format!("❌ Build failed: {err}"));
                    p.enter(BuildPhase::Failed);
                });
                if err.is_cancelled() {
                    tracing::info!("[Orchestrator] Build cancelled");
                } else {
                    tracing::error!("[Orchestrator] Build failed: {}", err);
                }
                Err(err)
            }
        }
    }

    async fn run_phases(&self, run: &Run<'_>, platforms: &[Platform]) -> Result<Vec<BuildOutput>> {
        let request = run.request;
        let target = run.target;

        self.enter(run, BuildPhase::Planning, "🧠 Master AI analyzing request and creating blueprint...");
        let blueprint = self
            .call_agent(
                run,
                BuildPhase::Planning,
                MASTER_AGENT_ID,
                &format!(
                    "Analyze this app request and create a detailed technical blueprint:\n\n\"{request}\"\n\nPlatform: {target}\n\nCreate a JSON blueprint with:\n- Project structure (folders and files)\n- Technologies to use\n- Features to implement\n- Component breakdown\n- API endpoints needed (if any)\n- State management approach\n\nOutput as valid JSON."
                ),
                "",
                false,
            )
            .await?;

        self.enter(run, BuildPhase::Architecture, "🏗️ Architecture team initializing project...");
        let [structure, framework, _dependencies] = self
            .run_team(
                run,
                BuildPhase::Architecture,
                [
                    (1, format!("Create the folder structure and main configuration files for: {request}. Platform: {target}")),
                    (2, format!("Set up the framework and build configuration for: {request}. Platform: {target}")),
                    (3, format!("Generate package.json and list all dependencies for: {request}. Platform: {target}")),
                ],
                &blueprint,
            )
            .await?;

        self.enter(run, BuildPhase::Frontend, "🎨 Frontend team creating UI components...");
        let [ui, layouts, interactions] = self
            .run_team(
                run,
                BuildPhase::Frontend,
                [
                    (4, format!("Create all UI components for: {request}. Platform: {target}")),
                    (5, format!("Design screen layouts and navigation for: {request}. Platform: {target}")),
                    (6, format!("Implement user interactions and state management for: {request}. Platform: {target}")),
                ],
                &blueprint,
            )
            .await?;

        self.enter(run, BuildPhase::Backend, "⚙️ Backend team setting up APIs...");
        let [apis, _database, _server_logic] = self
            .run_team(
                run,
                BuildPhase::Backend,
                [
                    (7, format!("Create API endpoints (or mock data) for: {request}. Platform: {target}")),
                    (8, format!("Set up data models and storage for: {request}. Platform: {target}")),
                    (9, format!("Implement business logic for: {request}. Platform: {target}")),
                ],
                &blueprint,
            )
            .await?;

        self.enter(run, BuildPhase::BuildCompile, "🔨 Build team compiling project...");
        let mut builds = Vec::with_capacity(platforms.len());
        for platform in platforms {
            let (task, context) = match platform {
                Platform::Web => (
                    format!("Compile all code into a single-file web app for: {request}"),
                    [&structure, &framework, &ui, &layouts, &interactions, &apis]
                        .map(String::as_str)
                        .join("\n"),
                ),
                Platform::Android => (
                    format!("Create Android app structure for: {request}"),
                    [&structure, &ui, &layouts, &interactions]
                        .map(String::as_str)
                        .join("\n"),
                ),
                Platform::Ios => (
                    format!("Create iOS app structure for: {request}"),
                    [&structure, &ui, &layouts, &interactions]
                        .map(String::as_str)
                        .join("\n"),
                ),
            };
            let output = self
                .call_agent(run, BuildPhase::BuildCompile, platform.build_agent_id(), &task, &context, true)
                .await?;
            builds.push(output);
        }

        self.enter(run, BuildPhase::Testing, "🧪 Testing team validating code...");
        let joined_builds = builds.join("\n\n");
        let checks = self
            .run_team(
                run,
                BuildPhase::Testing,
                [
                    (13, "Validate syntax and find errors in the generated code".to_string()),
                    (14, "Check for runtime issues and logic errors".to_string()),
                    (15, format!("Verify all features from request are implemented: {request}")),
                ],
                &joined_builds,
            )
            .await?;

        self.enter(run, BuildPhase::Debug, "🔧 Debug team fixing any errors...");
        let errors = self
            .call_agent(
                run,
                BuildPhase::Debug,
                16,
                "Identify all errors in the code",
                &checks.join("\n"),
                true,
            )
            .await?;

        if reports_problems(&errors) {
            self.update(run, |p| {
                p.total_tasks += FIX_ROUND_PARTICIPANTS;
                p.log("⚠️ Errors detected, applying fixes...");
            });
            let fixes = self
                .call_agent(
                    run,
                    BuildPhase::Debug,
                    17,
                    "Fix all errors found",
                    &format!("{}\n\nErrors:\n{errors}", builds.join("\n\n")),
                    true,
                )
                .await?;
            builds = vec![fixes];
            self.call_agent(run, BuildPhase::Debug, 18, "Verify all errors are fixed", &builds[0], true)
                .await?;
            self.log(run, "✅ All errors fixed and validated");
        } else {
            self.log(run, "✅ No errors found, code is clean");
        }

        self.enter(run, BuildPhase::Optimize, "⚡ Optimization AI enhancing performance...");
        let optimized = self
            .call_agent(
                run,
                BuildPhase::Optimize,
                19,
                "Optimize code for performance, responsiveness, and efficiency",
                &builds.join("\n\n"),
                true,
            )
            .await?;

        self.enter(run, BuildPhase::Integrate, "🎯 Master AI merging all components...");
        let final_build = self
            .call_agent(
                run,
                BuildPhase::Integrate,
                MASTER_AGENT_ID,
                "Merge all components into final deployable app",
                &format!("{optimized}\n\nEnsure: Complete functionality, no errors, production-ready"),
                true,
            )
            .await?;

        let files = parse_deliverable(&final_build);
        let outputs: Vec<BuildOutput> = platforms
            .iter()
            .map(|platform| BuildOutput {
                platform: *platform,
                files: files.clone(),
                status: BuildStatus::Ready,
            })
            .collect();

        self.update(run, |p| {
            p.enter(BuildPhase::Completed);
            p.log("🎉 Build completed successfully!");
            p.log(format!("📦 Generated {} files", files.len()));
        });
        tracing::info!("[Orchestrator] Build completed with {} files", files.len());

        Ok(outputs)
    }

    /// Runs three agents concurrently and waits for all of them.
    async fn run_team(
        &self,
        run: &Run<'_>,
        phase: BuildPhase,
        tasks: [(u8, String); 3],
        context: &str,
    ) -> Result<[String; 3]> {
        let calls = tasks
            .iter()
            .map(|(id, task)| self.call_agent(run, phase, *id, task, context, true));
        let outputs = join_all(calls)
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        outputs
            .try_into()
            .map_err(|_| KilnError::build(phase.stage(), 0, "team returned an unexpected number of results"))
    }

    /// One agent call. With `finish == false` the agent stays `Working`
    /// after success (the master between planning and integration).
    async fn call_agent(
        &self,
        run: &Run<'_>,
        phase: BuildPhase,
        id: u8,
        task: &str,
        context: &str,
        finish: bool,
    ) -> Result<String> {
        let role = self
            .roster
            .get(id)
            .ok_or_else(|| KilnError::config(format!("roster has no agent #{id}")))?;

        self.update_agent(run, id, |agent| agent.start(task));

        let context = cap_context(context, self.max_context_chars);
        let result = match self
            .client
            .prompts()
            .render_agent(role.id, &role.role, &role.team, context, task)
        {
            Ok(prompt) => {
                let request = CompletionRequest::new(prompt, TaskMode::Coding.sampling())
                    .with_user_input(run.request);
                self.client.complete(request, run.cancel).await
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(output) => {
                self.update(run, |p| p.log(format!("✓ AI #{} ({}) completed task", role.id, role.role)));
                self.update_agent(run, id, |agent| {
                    if finish {
                        agent.complete(output.clone());
                    } else {
                        agent.output = Some(output.clone());
                    }
                });
                Ok(output)
            }
            Err(err) => {
                self.update(run, |p| p.log(format!("✗ AI #{} ({}) error: {}", role.id, role.role, err)));
                self.update_agent(run, id, |agent| agent.fail(err.to_string()));
                Err(match err {
                    GenerationError::Cancelled => KilnError::Cancelled,
                    other => KilnError::build(phase.stage(), id, other.to_string()),
                })
            }
        }
    }

    fn enter(&self, run: &Run<'_>, phase: BuildPhase, message: &str) {
        self.update(run, |p| {
            p.enter(phase);
            p.log(message);
        });
    }

    fn log(&self, run: &Run<'_>, message: &str) {
        self.update(run, |p| p.log(message));
    }

    fn update(&self, run: &Run<'_>, f: impl FnOnce(&mut BuildProgress)) {
        self.modify(run, |state| f(&mut state.progress));
    }

    fn update_agent(&self, run: &Run<'_>, id: u8, f: impl FnOnce(&mut AgentDescriptor)) {
        self.modify(run, |state| {
            if let Some(agent) = state.agent_mut(id) {
                f(agent);
            }
        });
    }

    fn modify(&self, run: &Run<'_>, f: impl FnOnce(&mut BuildState)) {
        {
            let mut state = self.lock();
            if state.run_id != run.id {
                tracing::debug!("[Orchestrator] Dropping update from superseded build {}", run.id);
                return;
            }
            f(&mut *state);
            state.recount();
        }
        self.publish();
    }

    fn publish(&self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.progress();
        for observer in &self.observers {
            observer(&snapshot);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BuildState> {
        // A panicking observer must not wedge the orchestrator.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The error detector's verdict.
fn reports_problems(report: &str) -> bool {
    let lower = report.to_lowercase();
    lower.contains("error") || lower.contains("issue")
}

/// Keeps the last `max_chars` characters.
fn cap_context(context: &str, max_chars: usize) -> &str {
    let total = context.chars().count();
    if total <= max_chars {
        return context;
    }
    let skip = total - max_chars;
    match context.char_indices().nth(skip) {
        Some((offset, _)) => &context[offset..],
        None => "",
    }
}

/// Counts agents in `status`; convenience for observers and tests.
pub fn count_with_status(agents: &[AgentDescriptor], status: AgentStatus) -> usize {
    agents.iter().filter(|a| a.status == status).count()
}
