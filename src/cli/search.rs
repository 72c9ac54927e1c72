use crate::cli::Context;
use crate::core::library::Library;
use crate::core::manifest::AppManifest;
use crate::utils::output::{self, OutputFormat};

/// Matches from every library, then every archive.
pub fn search(ctx: &Context, pattern: &str) -> anyhow::Result<Vec<AppManifest>> {
    let collections = ctx
        .inventory
        .libraries
        .iter()
        .chain(ctx.inventory.archives.iter().map(|a| &**a));
    let mut results = Vec::new();
    for collection in collections {
        results.extend(Library::find_by_name_pattern(collection, pattern)?);
    }
    Ok(results)
}

pub fn execute(ctx: &Context, pattern: &str, format: &OutputFormat) -> anyhow::Result<()> {
    if matches!(format, OutputFormat::Normal) {
        println!("🔎 Searching for '{}'", pattern);
    }
    let results = search(ctx, pattern)?;
    print!("{}", output::render_games(&results, format));
    Ok(())
}
