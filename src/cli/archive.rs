use crate::cli::Context;
use crate::core::manifest::AppManifest;
use crate::core::transfer::Transfers;

pub fn run(ctx: &Context, game: &str, to: Option<usize>) -> anyhow::Result<AppManifest> {
    let manifest = ctx.installed_game(game)?;
    let archive = to.map(|i| ctx.inventory.archive(i)).transpose()?;
    let cloner = ctx.cloner()?;
    let transfers = Transfers::new(&ctx.host, &cloner, &ctx.inventory.archives);
    Ok(transfers.archive(&manifest, archive)?)
}

pub fn execute(ctx: &Context, game: &str, to: Option<usize>) -> anyhow::Result<()> {
    let archived = run(ctx, game, to)?;
    println!(
        "✅ Archived [{}] {} to {}",
        archived.app_id(),
        archived.name(),
        archived.install_path().display()
    );
    Ok(())
}
