use crate::cli::Context;
use crate::core::transfer::Transfers;

pub fn execute(ctx: &Context, game: &str, force: bool) -> anyhow::Result<()> {
    let manifest = ctx.installed_game(game)?;
    let cloner = ctx.cloner()?;
    let transfers = Transfers::new(&ctx.host, &cloner, &ctx.inventory.archives);
    transfers.remove(&manifest, force)?;
    println!("🗑️  Removed {} from {}", manifest.name(), manifest.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::testing;
    use tempfile::tempdir;

    #[test]
    fn test_remove_unarchived_needs_force() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(dir.path());

        assert!(execute(&ctx, "DOOM", false).is_err());
        assert_eq!(ctx.inventory.libraries[0].games().unwrap().len(), 1);
        execute(&ctx, "DOOM", true).unwrap();
        assert!(ctx.inventory.libraries[0].games().unwrap().is_empty());
    }
}
