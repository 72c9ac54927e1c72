use crate::cli::{Context, Target};
use crate::core::library::IssueReport;
use crate::utils::output::{self, OutputFormat};

pub fn report(ctx: &Context, target: Target) -> anyhow::Result<IssueReport> {
    Ok(match target {
        Target::Library(i) => ctx.inventory.library(i)?.detect_issues()?,
        Target::Archive(i) => ctx
            .inventory
            .archive(i)?
            .detect_issues(&ctx.inventory.libraries)?,
    })
}

pub fn execute(ctx: &Context, target: Target, format: &OutputFormat) -> anyhow::Result<()> {
    if matches!(format, OutputFormat::Normal) {
        println!("🔎 Checking {} ({})", ctx.collection(target)?.path().display(), target);
    }
    print!("{}", output::render_issues(&report(ctx, target)?, format));
    Ok(())
}
