pub mod dependencies;
pub mod fsutil;
pub mod lock;
pub mod logging;
pub mod output;
pub mod prompt;
pub mod steam_paths;
