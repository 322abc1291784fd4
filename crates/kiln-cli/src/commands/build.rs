use anyhow::Result;
use colored::Colorize;
use kiln_core::build::PlatformTarget;

use crate::GlobalArgs;
use crate::context::AppContext;

pub async fn run(args: &GlobalArgs, request: &str, target: PlatformTarget) -> Result<()> {
    let ctx = AppContext::open_with_build_log(args)?;
    println!("{}", format!("🏗️  Building for {target}...").bright_magenta());

    let outputs = ctx.session.build_app(request, target).await?;

    for output in &outputs {
        println!(
            "{}",
            format!("📦 {} ({} files)", output.platform, output.files.len()).green()
        );
    }
    if let Some(first) = outputs.first() {
        super::print_files(&first.files);
    }
    ctx.save()
}
