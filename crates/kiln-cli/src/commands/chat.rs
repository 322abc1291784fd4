use anyhow::Result;

use crate::GlobalArgs;
use crate::context::AppContext;

pub async fn run(args: &GlobalArgs, prompt: &str) -> Result<()> {
    let ctx = AppContext::open(args)?;
    let outcome = ctx.session.submit(prompt).await?;
    super::print_outcome(&outcome);
    ctx.save()
}
