//! # Steam Archivist
//!
//! Keeps Steam libraries and offline game archives consistent.
//!
//! ## Features
//!
//! - List libraries, archives and the games in them
//! - Detect orphaned install directories, dangling manifests and size drift
//! - Archive games, restore them, and move them between libraries safely
//!
//! ## Usage
//!
//! List the discovered libraries:
//!
//! ```text
//! steam-archivist libraries
//! ```
//!
//! Check a library for problems:
//!
//! ```text
//! steam-archivist issues lib:0
//! ```
//!
//! Archive a game, then move it to the second library:
//!
//! ```text
//! steam-archivist archive "DOOM"
//! steam-archivist move "DOOM" 1
//! ```

use std::process::ExitCode;

use clap::Parser;

mod cli;
mod core;
mod error;
mod host;
mod settings;
mod utils;

#[cfg(test)]
mod test_helpers;

use cli::{Cli, Context};

fn main() -> ExitCode {
    let cli = Cli::parse();
    utils::logging::init(cli.debug);

    let result = Context::load().and_then(|ctx| cli::dispatch(&cli.command, &ctx));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
