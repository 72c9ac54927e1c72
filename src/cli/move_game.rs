use crate::cli::Context;
use crate::core::manifest::AppManifest;
use crate::core::transfer::{MoveOptions, Transfers};

pub fn run(ctx: &Context, game: &str, library: usize, force: bool, fast: bool) -> anyhow::Result<AppManifest> {
    let manifest = ctx.installed_game(game)?;
    let destination = ctx.inventory.library(library)?;
    let cloner = ctx.cloner()?;
    let transfers = Transfers::new(&ctx.host, &cloner, &ctx.inventory.archives);
    Ok(transfers.move_game(&manifest, destination, MoveOptions { force, fast })?)
}

pub fn execute(ctx: &Context, game: &str, library: usize, force: bool, fast: bool) -> anyhow::Result<()> {
    let moved = run(ctx, game, library, force, fast)?;
    println!("✅ Moved {} to {}", moved.name(), moved.install_path().display());
    Ok(())
}
