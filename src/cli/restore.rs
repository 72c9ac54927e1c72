use std::path::PathBuf;

use crate::cli::Context;
use crate::core::transfer::Transfers;

pub fn run(ctx: &Context, game: &str, library: usize, from: Option<usize>) -> anyhow::Result<PathBuf> {
    let (archive, archived) = ctx.archived_game(game, from)?;
    log::debug!("restoring from {}", archive.path().display());
    let destination = ctx.inventory.library(library)?;
    let cloner = ctx.cloner()?;
    let transfers = Transfers::new(&ctx.host, &cloner, &ctx.inventory.archives);
    Ok(transfers.restore(&archived, destination)?)
}

pub fn execute(ctx: &Context, game: &str, library: usize, from: Option<usize>) -> anyhow::Result<()> {
    let restored = run(ctx, game, library, from)?;
    println!("✅ Restored data to {}", restored.display());
    println!("   Install the game into this library from Steam to pick it up.");
    Ok(())
}
