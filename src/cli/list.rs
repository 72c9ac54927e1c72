use crate::cli::{Context, Target};
use crate::utils::output::{self, OutputFormat, SortKey};

pub fn render(ctx: &Context, target: Target, sort: SortKey, format: &OutputFormat) -> anyhow::Result<String> {
    let collection = ctx.collection(target)?;
    let mut games: Vec<_> = collection.game_lookup()?.manifests().cloned().collect();
    output::sort_games(&mut games, sort);

    let mut out = String::new();
    if matches!(format, OutputFormat::Normal) {
        out.push_str(&format!("📂 {} ({})\n", collection.path().display(), target));
    }
    out.push_str(&output::render_games(&games, format));
    Ok(out)
}

pub fn execute(ctx: &Context, target: Target, sort: SortKey, format: &OutputFormat) -> anyhow::Result<()> {
    print!("{}", render(ctx, target, sort, format)?);
    Ok(())
}
