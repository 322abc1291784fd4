use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use kiln_core::export::export_files;

use crate::GlobalArgs;
use crate::context::AppContext;

pub fn run(args: &GlobalArgs, out: Option<&Path>) -> Result<()> {
    let ctx = AppContext::open_local(args)?;
    match out {
        Some(path) => {
            ctx.session.export(path)?;
            println!("{}", format!("Exported to {}", path.display()).green());
        }
        None => println!("{}", export_files(&ctx.session.store().files())?),
    }
    Ok(())
}
