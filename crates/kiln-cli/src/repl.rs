//! Interactive session: plain lines are chat prompts, `/` lines are commands.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use kiln_core::build::{Platform, PlatformTarget};
use kiln_core::preview::ViewMode;
use kiln_execution::FixOutcome;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use crate::GlobalArgs;
use crate::commands;
use crate::context::AppContext;

const COMMANDS: [&str; 13] = [
    "/build", "/fix", "/error", "/files", "/open", "/new", "/think", "/clear", "/preview",
    "/refresh", "/export", "/quality", "/help",
];

const DEFAULT_PREVIEW_FILE: &str = "kiln-preview.html";

/// Completion, highlighting and hints for slash commands.
#[derive(Clone)]
struct KilnHelper;

impl Helper for KilnHelper {}

impl Completer for KilnHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return Ok((0, vec![]));
        }
        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for KilnHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for KilnHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.starts_with('/') && !line.contains(' ') {
            COMMANDS
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for KilnHelper {}

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Chat(String),
    Build {
        target: PlatformTarget,
        request: String,
    },
    Fix,
    /// A runtime error seen in the browser, pasted by the user.
    ReportError(String),
    Files,
    Open(String),
    New(String),
    Think,
    Clear,
    Preview(ViewMode),
    Refresh,
    Export(Option<PathBuf>),
    Quality,
    Help,
    Unknown(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Self::Chat(line.to_string());
        };
        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map(|(name, rest)| (name, rest.trim()))
            .unwrap_or((command, ""));

        match name {
            "build" => {
                // An optional leading platform word: `/build ios a weather app`.
                let (target, request) = match rest.split_once(char::is_whitespace) {
                    Some((first, tail)) => match first.parse::<PlatformTarget>() {
                        Ok(target) => (target, tail.trim()),
                        Err(_) => (PlatformTarget::default(), rest),
                    },
                    None => (PlatformTarget::default(), rest),
                };
                Self::Build {
                    target,
                    request: request.to_string(),
                }
            }
            "fix" => Self::Fix,
            "error" => Self::ReportError(rest.to_string()),
            "files" => Self::Files,
            "open" => Self::Open(rest.to_string()),
            "new" => Self::New(rest.to_string()),
            "think" => Self::Think,
            "clear" => Self::Clear,
            "preview" => Self::Preview(match rest {
                "mobile" => ViewMode::Mobile,
                "android" => ViewMode::Device(Platform::Android),
                "ios" => ViewMode::Device(Platform::Ios),
                _ => ViewMode::Desktop,
            }),
            "refresh" => Self::Refresh,
            "export" => Self::Export((!rest.is_empty()).then(|| PathBuf::from(rest))),
            "quality" => Self::Quality,
            "help" => Self::Help,
            other => Self::Unknown(other.to_string()),
        }
    }
}

fn print_help() {
    for (command, text) in [
        ("/build [web|android|ios|all] <request>", "run the multi-agent build"),
        ("/error <message>", "record a runtime error seen in the preview"),
        ("/fix", "ask the AI to fix the last preview error"),
        ("/files", "list project files"),
        ("/open <name>", "show a file and make it active"),
        ("/new <name>", "add an empty file and make it active"),
        ("/think", "toggle deep reasoning mode"),
        ("/clear", "start over with an empty project"),
        ("/preview [desktop|mobile|android|ios]", "write the preview page"),
        ("/refresh", "reload the preview, dropping the recorded error"),
        ("/export [path]", "save the project files"),
        ("/quality", "run the code quality checks"),
    ] {
        println!("  {:<40} {}", command.bright_cyan(), text.bright_black());
    }
}

pub async fn run(args: &GlobalArgs) -> Result<()> {
    let mut ctx = AppContext::open_with_build_log(args)?;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(KilnHelper));

    println!("{}", "=== Kiln ===".bright_magenta().bold());
    println!(
        "{}",
        "Describe the app you want. Type /help for commands, 'quit' to exit.".bright_black()
    );
    println!();

    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed == "quit" || trimmed == "exit" {
            break;
        }
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(trimmed);

        if let Err(err) = handle(&mut ctx, Input::parse(trimmed)).await {
            eprintln!("{}", format!("Error: {err:#}").red());
        }
    }

    ctx.save()?;
    println!("{}", format!("Saved to {}. Goodbye!", ctx.project.display()).bright_green());
    Ok(())
}

async fn handle(ctx: &mut AppContext, input: Input) -> Result<()> {
    let out = PathBuf::from(DEFAULT_PREVIEW_FILE);
    match input {
        Input::Preview(view) => {
            if ctx.render_preview(view, &out)? {
                commands::preview::print_written(view, &out);
            } else {
                println!("{}", "Preview is up to date.".bright_black());
            }
        }
        Input::Refresh => {
            let view = ctx.preview_view().unwrap_or_default();
            ctx.session.store().refresh_preview();
            ctx.render_preview(view, &out)?;
            commands::preview::print_written(view, &out);
        }
        other => handle_session(ctx, other).await?,
    }
    Ok(())
}

async fn handle_session(ctx: &AppContext, input: Input) -> Result<()> {
    let session = &ctx.session;
    let store = session.store();
    match input {
        Input::Chat(prompt) => {
            let outcome = session.submit(&prompt).await?;
            commands::print_outcome(&outcome);
        }
        Input::Build { target, request } => {
            let outputs = session.build_app(&request, target).await?;
            if let Some(first) = outputs.first() {
                commands::print_files(&first.files);
            }
        }
        Input::Fix => match session.auto_fix().await {
            FixOutcome::Fixed { message, files } => {
                println!("{}", message.bright_blue());
                commands::print_files(&files);
            }
            FixOutcome::NotFixed { message } => {
                println!("{}", format!("Could not fix it: {message}").yellow())
            }
            FixOutcome::NoError => println!("{}", "No preview error recorded.".bright_black()),
            FixOutcome::AlreadyRunning => println!("{}", "A fix is already running.".yellow()),
        },
        Input::ReportError(message) => {
            let payload = serde_json::json!({ "type": "error", "message": message });
            if session.receive_preview_message(&payload) {
                println!("{}", "Error recorded. Use /fix to repair it.".bright_black());
            }
        }
        Input::Files => {
            let active = store.active_file().map(|f| f.name);
            for file in store.files() {
                let marker = if active.as_deref() == Some(file.name.as_str()) { "*" } else { " " };
                println!("{} {} ({} bytes)", marker, file.name.green(), file.content.len());
            }
        }
        Input::Open(name) => match store.file(&name) {
            Some(file) => {
                store.set_active_file(&file.name);
                println!("{}", format!("--- {} ---", file.name).bright_black());
                println!("{}", file.content);
            }
            None => println!("{}", format!("No file named '{name}'").yellow()),
        },
        Input::New(name) => {
            session.create_file(&name, "")?;
            println!("{}", format!("Created {}", name.trim()).green());
        }
        Input::Think => {
            let enabled = !store.extra_think_mode();
            store.set_extra_think_mode(enabled);
            let state = if enabled { "on" } else { "off" };
            println!("{}", format!("Deep reasoning mode {state}").bright_black());
        }
        Input::Clear => {
            session.clear_project();
            println!("{}", "Project cleared.".bright_black());
        }
        Input::Preview(_) | Input::Refresh => {}
        Input::Export(path) => {
            let path = path.unwrap_or_else(|| ctx.project.clone());
            session.export(&path)?;
            println!("{}", format!("Exported to {}", path.display()).green());
        }
        Input::Quality => commands::print_quality(&session.quality()),
        Input::Help => print_help(),
        Input::Unknown(name) => println!("{}", format!("Unknown command /{name}").bright_black()),
    }
    Ok(())
}
