use anyhow::{Result, bail};
use colored::Colorize;
use kiln_core::templates::{QUICK_ACTIONS, find_quick_action};

use crate::GlobalArgs;

pub async fn run(args: &GlobalArgs, label: Option<&str>) -> Result<()> {
    let Some(label) = label else {
        for action in &QUICK_ACTIONS {
            println!("{:<14} {}", action.label.bright_cyan(), action.prompt.bright_black());
        }
        return Ok(());
    };

    let Some(action) = find_quick_action(label) else {
        bail!("Unknown template '{label}'. Run `kiln templates` to list them.");
    };
    println!("{}", format!("> {}", action.prompt).green());
    super::chat::run(args, action.prompt).await
}
