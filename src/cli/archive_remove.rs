use crate::cli::Context;
use crate::core::archive::Removal;
use crate::utils::output::{self, OutputFormat};
use crate::utils::prompt::{AssumeYes, Confirm, StdinConfirm};

pub fn run(
    ctx: &Context,
    game: Option<&str>,
    pattern: Option<&str>,
    index: usize,
    confirm: &mut dyn Confirm,
) -> anyhow::Result<Vec<Removal>> {
    let archive = ctx.inventory.archive(index)?;
    let manifest = match game {
        Some(query) => Some(ctx.archived_game(query, Some(index))?.1),
        None => None,
    };
    Ok(archive.remove(manifest.as_ref(), pattern, confirm)?)
}

pub fn execute(
    ctx: &Context,
    game: Option<&str>,
    pattern: Option<&str>,
    index: usize,
    yes: bool,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let removals = if yes {
        run(ctx, game, pattern, index, &mut AssumeYes)?
    } else {
        run(ctx, game, pattern, index, &mut StdinConfirm)?
    };
    print!("{}", output::render_removals(&removals, format));
    Ok(())
}
