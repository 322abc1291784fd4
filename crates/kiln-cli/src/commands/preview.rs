use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use kiln_core::preview::ViewMode;

use crate::GlobalArgs;
use crate::context::AppContext;

pub fn run(args: &GlobalArgs, view: ViewMode, out: &Path) -> Result<()> {
    let mut ctx = AppContext::open_local(args)?;
    ctx.render_preview(view, out)?;
    print_written(view, out);
    Ok(())
}

pub fn print_written(view: ViewMode, out: &Path) {
    println!(
        "{}",
        format!("Preview ({}) written to {}", view.label(), out.display()).green()
    );
}
