use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use kiln_core::build::{Platform, PlatformTarget};
use kiln_core::export::DEFAULT_EXPORT_FILE;
use kiln_core::preview::ViewMode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod context;
mod repl;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(version, about = "Kiln - build web apps by chatting with an AI", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project file the files are loaded from and saved to
    #[arg(long, global = true, default_value = DEFAULT_EXPORT_FILE)]
    pub project: PathBuf,

    /// Use the built-in templates instead of the Gemini API
    #[arg(long, global = true)]
    pub offline: bool,

    /// Ask the model to reason before writing code
    #[arg(long, global = true)]
    pub think: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one chat prompt and save the generated files
    Chat {
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
    /// Run the multi-agent build for an app request
    Build {
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
        /// web, android, ios or all
        #[arg(long, default_value = "web")]
        platform: PlatformTarget,
    },
    /// Write a preview page for the project
    Preview {
        #[arg(long, value_enum, default_value_t = ViewArg::Desktop)]
        view: ViewArg,
        #[arg(long, default_value = "kiln-preview.html")]
        out: PathBuf,
    },
    /// Export the project files as JSON (stdout when no --out)
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List quick-start templates, or run one by label
    Templates { label: Option<String> },
    /// Interactive session
    Repl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewArg {
    Desktop,
    Mobile,
    Android,
    Ios,
}

impl From<ViewArg> for ViewMode {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::Desktop => ViewMode::Desktop,
            ViewArg::Mobile => ViewMode::Mobile,
            ViewArg::Android => ViewMode::Device(Platform::Android),
            ViewArg::Ios => ViewMode::Device(Platform::Ios),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kiln=info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat { prompt } => commands::chat::run(&cli.global, &prompt.join(" ")).await?,
        Commands::Build { prompt, platform } => {
            commands::build::run(&cli.global, &prompt.join(" "), platform).await?
        }
        Commands::Preview { view, out } => commands::preview::run(&cli.global, view.into(), &out)?,
        Commands::Export { out } => commands::export::run(&cli.global, out.as_deref())?,
        Commands::Templates { label } => {
            commands::templates::run(&cli.global, label.as_deref()).await?
        }
        Commands::Repl => repl::run(&cli.global).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_arguments() {
        let cli = Cli::parse_from(["kiln", "build", "a", "todo", "app", "--platform", "all", "--offline"]);
        assert!(cli.global.offline);
        match cli.command {
            Commands::Build { prompt, platform } => {
                assert_eq!(prompt.join(" "), "a todo app");
                assert_eq!(platform, PlatformTarget::All);
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_view_mapping() {
        assert_eq!(ViewMode::from(ViewArg::Ios), ViewMode::Device(Platform::Ios));
        assert_eq!(ViewMode::from(ViewArg::Mobile), ViewMode::Mobile);
    }
}
