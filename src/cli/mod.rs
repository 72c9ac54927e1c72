use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context as _};
use clap::{Args, Parser, Subcommand};

use crate::core::archive::Archive;
use crate::core::discovery::{self, Inventory};
use crate::core::library::Library;
use crate::core::manifest::AppManifest;
use crate::host::clone::Cloner;
use crate::host::Host;
use crate::settings::Settings;
use crate::utils::output::{determine_format, OutputFormat, SortKey};

pub mod archive;
pub mod archive_remove;
pub mod collections;
pub mod issues;
pub mod list;
pub mod move_game;
pub mod remove;
pub mod restore;
pub mod search;
pub mod tools;

/// Steam library archivist
///
/// Keeps Steam libraries and offline archives in sync: finds inconsistencies,
/// archives games, and moves them between libraries without losing the only
/// copy.
#[derive(Parser)]
#[command(name = "steam-archivist")]
#[command(about = "Reconcile and move games between Steam libraries and archives", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug, Default)]
pub struct FormatArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Output in plain format (no formatting or emojis)
    #[arg(long)]
    pub plain: bool,

    /// Specify custom delimiter for output
    #[arg(long)]
    pub delimiter: Option<String>,
}

impl FormatArgs {
    pub fn format(&self) -> OutputFormat {
        determine_format(self.json, self.plain, &self.delimiter)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List Steam libraries
    Libraries {
        #[command(flatten)]
        format: FormatArgs,
    },

    /// List configured archives
    Archives {
        #[command(flatten)]
        format: FormatArgs,
    },

    /// List the games in a library or archive
    List {
        /// lib:N or archive:N
        target: Target,

        /// Sort order
        #[arg(long, value_enum, default_value_t = SortKey::Name)]
        sort: SortKey,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Search every library and archive for games matching a regex
    Search {
        pattern: String,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Report orphaned data, dangling manifests and size discrepancies
    Issues {
        /// lib:N or archive:N
        target: Target,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Copy an installed game into an archive
    Archive {
        /// Game name or App ID
        game: String,

        /// Archive index (defaults to the first)
        #[arg(long)]
        to: Option<usize>,
    },

    /// Move an installed game to another library
    Move {
        /// Game name or App ID
        game: String,

        /// Destination library index
        library: usize,

        /// Skip the Steam and archived-copy checks
        #[arg(long)]
        force: bool,

        /// Rename instead of copying when on the same volume
        #[arg(long)]
        fast: bool,
    },

    /// Copy an archived game's data back into a library
    Restore {
        /// Game name or App ID
        game: String,

        /// Destination library index
        library: usize,

        /// Archive index to restore from (defaults to the last one holding the game)
        #[arg(long)]
        from: Option<usize>,
    },

    /// Delete an installed game
    Remove {
        /// Game name or App ID
        game: String,

        /// Skip the Steam and archived-copy checks
        #[arg(long)]
        force: bool,
    },

    /// Delete games from an archive
    ArchiveRemove {
        /// Game name or App ID
        #[arg(long)]
        game: Option<String>,

        /// Regex over game names
        #[arg(long)]
        pattern: Option<String>,

        /// Archive index
        #[arg(long, default_value_t = 0)]
        archive: usize,

        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Show which copy tools are available
    Tools {
        #[command(flatten)]
        format: FormatArgs,
    },
}

/// A library or archive picked by index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Library(usize),
    Archive(usize),
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, index) = s
            .split_once(':')
            .ok_or_else(|| format!("expected lib:N or archive:N, got {:?}", s))?;
        let index: usize = index
            .parse()
            .map_err(|_| format!("{:?} is not an index", index))?;
        match kind {
            "lib" | "library" => Ok(Target::Library(index)),
            "archive" => Ok(Target::Archive(index)),
            _ => Err(format!("unknown target kind {:?}", kind)),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Library(i) => write!(f, "lib:{}", i),
            Target::Archive(i) => write!(f, "archive:{}", i),
        }
    }
}

/// What every command works against.
pub struct Context {
    pub host: Host,
    pub settings: Settings,
    pub inventory: Inventory,
}

impl Context {
    pub fn new(host: Host, settings: Settings) -> anyhow::Result<Self> {
        let inventory = discovery::discover(&host, &settings).context("discovery failed")?;
        Ok(Self {
            host,
            settings,
            inventory,
        })
    }

    pub fn load() -> anyhow::Result<Self> {
        let settings = Settings::load().context("could not load settings")?;
        Self::new(Host::detect(), settings)
    }

    pub fn cloner(&self) -> anyhow::Result<Cloner> {
        let (strategy, source) = self.settings.clone_strategy()?;
        log::debug!("clone strategy {:?} from {:?}", strategy, source);
        Ok(Cloner::from_strategy(&strategy)?)
    }

    /// The collection a target names, as a library view.
    pub fn collection(&self, target: Target) -> anyhow::Result<&Library> {
        Ok(match target {
            Target::Library(i) => self.inventory.library(i)?,
            Target::Archive(i) => &**self.inventory.archive(i)?,
        })
    }

    /// An installed game by exact name or App ID, searching every library.
    pub fn installed_game(&self, query: &str) -> anyhow::Result<AppManifest> {
        let mut found = None;
        for library in &self.inventory.libraries {
            if let Some(game) = find_game(library, query)? {
                found = Some(game);
            }
        }
        found.ok_or_else(|| anyhow!("no installed game matches {:?}", query))
    }

    /// An archived game by exact name or App ID. Without an index the last
    /// archive holding it wins.
    pub fn archived_game(
        &self,
        query: &str,
        index: Option<usize>,
    ) -> anyhow::Result<(&Archive, AppManifest)> {
        let candidates: Vec<&Archive> = match index {
            Some(i) => vec![self.inventory.archive(i)?],
            None => self.inventory.archives.iter().collect(),
        };
        let mut found = None;
        for archive in candidates {
            if let Some(game) = find_game(archive, query)? {
                found = Some((archive, game));
            }
        }
        found.ok_or_else(|| anyhow!("no archived game matches {:?}", query))
    }
}

fn find_game(library: &Library, query: &str) -> anyhow::Result<Option<AppManifest>> {
    let lookup = library.game_lookup()?;
    if let Some(game) = lookup.get(query) {
        return Ok(Some(game.clone()));
    }
    Ok(query
        .parse::<u32>()
        .ok()
        .and_then(|id| lookup.manifests().find(|m| m.app_id() == id).cloned()))
}

/// Run one command against a loaded context.
pub fn dispatch(command: &Commands, ctx: &Context) -> anyhow::Result<()> {
    match command {
        Commands::Libraries { format } => collections::libraries(ctx, &format.format()),
        Commands::Archives { format } => collections::archives(ctx, &format.format()),
        Commands::List {
            target,
            sort,
            format,
        } => list::execute(ctx, *target, *sort, &format.format()),
        Commands::Search { pattern, format } => search::execute(ctx, pattern, &format.format()),
        Commands::Issues { target, format } => issues::execute(ctx, *target, &format.format()),
        Commands::Archive { game, to } => archive::execute(ctx, game, *to),
        Commands::Move {
            game,
            library,
            force,
            fast,
        } => move_game::execute(ctx, game, *library, *force, *fast),
        Commands::Restore {
            game,
            library,
            from,
        } => restore::execute(ctx, game, *library, *from),
        Commands::Remove { game, force } => remove::execute(ctx, game, *force),
        Commands::ArchiveRemove {
            game,
            pattern,
            archive,
            yes,
            format,
        } => archive_remove::execute(
            ctx,
            game.as_deref(),
            pattern.as_deref(),
            *archive,
            *yes,
            &format.format(),
        ),
        Commands::Tools { format } => tools::execute(ctx, &format.format()),
    }
}
