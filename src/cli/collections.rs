use crate::cli::Context;
use crate::core::library::Library;
use crate::host::disk::DiskManager;
use crate::utils::output::{self, CollectionRecord, OutputFormat};

fn record(
    index: usize,
    library: &Library,
    disks: &dyn DiskManager,
) -> anyhow::Result<CollectionRecord> {
    Ok(CollectionRecord {
        index,
        kind: library.layout(),
        path: library.path().to_path_buf(),
        games: library.game_lookup()?.len(),
        size: library.declared_size()?,
        used: library
            .used_space(disks)
            .map_err(|e| log::debug!("used space of {}: {}", library.path().display(), e))
            .ok(),
        free: library
            .free_space(disks)
            .map_err(|e| log::debug!("free space of {}: {}", library.path().display(), e))
            .ok(),
        max_size: None,
    })
}

pub fn library_records(ctx: &Context) -> anyhow::Result<Vec<CollectionRecord>> {
    let disks = ctx.host.disks();
    ctx.inventory
        .libraries
        .iter()
        .enumerate()
        .map(|(index, library)| record(index, library, disks))
        .collect()
}

pub fn archive_records(ctx: &Context) -> anyhow::Result<Vec<CollectionRecord>> {
    let disks = ctx.host.disks();
    ctx.inventory
        .archives
        .iter()
        .enumerate()
        .map(|(index, archive)| -> anyhow::Result<CollectionRecord> {
            Ok(CollectionRecord {
                max_size: archive
                    .max_size(disks)
                    .map_err(|e| log::debug!("max size of {}: {}", archive.path().display(), e))
                    .ok(),
                ..record(index, archive, disks)?
            })
        })
        .collect()
}

pub fn libraries(ctx: &Context, format: &OutputFormat) -> anyhow::Result<()> {
    if let (OutputFormat::Normal, Some(root)) = (format, &ctx.inventory.steam_root) {
        println!("🎮 Steam: {}", root.display());
    }
    print!("{}", output::render_collections(&library_records(ctx)?, format));
    Ok(())
}

pub fn archives(ctx: &Context, format: &OutputFormat) -> anyhow::Result<()> {
    print!("{}", output::render_collections(&archive_records(ctx)?, format));
    Ok(())
}
