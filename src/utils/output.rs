use std::fmt::Write as _;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;

use crate::core::archive::Removal;
use crate::core::library::{IssueReport, SizeDelta};
use crate::core::manifest::{AppManifest, Layout};
use crate::utils::fsutil::format_size;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Normal,
    Plain,
    Json,
    Delimited(String),
}

pub fn determine_format(json: bool, plain: bool, delimiter: &Option<String>) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else if plain {
        OutputFormat::Plain
    } else if let Some(d) = delimiter {
        OutputFormat::Delimited(d.clone())
    } else {
        OutputFormat::Normal
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    #[default]
    Name,
    #[value(name = "name.lower")]
    NameLower,
    Size,
    #[value(name = "size.desc")]
    SizeDesc,
    Id,
}

pub fn sort_games(games: &mut [AppManifest], key: SortKey) {
    match key {
        SortKey::Name => games.sort_by_key(AppManifest::name),
        SortKey::NameLower => games.sort_by_key(|g| g.name().to_lowercase()),
        SortKey::Size => games.sort_by_key(AppManifest::size),
        SortKey::SizeDesc => games.sort_by_key(|g| std::cmp::Reverse(g.size())),
        SortKey::Id => games.sort_by_key(AppManifest::app_id),
    }
}

const NAME_WIDTH: usize = 50;

/// Cuts `name` to the name column, marking the cut with `...`.
fn fit_name(name: &str) -> String {
    if name.chars().count() <= NAME_WIDTH {
        return name.to_string();
    }
    let mut cut: String = name.chars().take(NAME_WIDTH - 3).collect();
    cut.push_str("...");
    cut
}

/// Fixed-width listing with sizes in GiB and a TOTAL row.
pub fn render_table(games: &[AppManifest]) -> String {
    let mut out = String::new();
    let mut total = 0;
    for game in games {
        total += game.size();
        let _ = writeln!(
            out,
            "{:>50} | {:8.2} | {}",
            fit_name(&game.name()),
            game.size() as f64 / GIB,
            game.app_id()
        );
    }
    let _ = writeln!(out, "{}", "-".repeat(70));
    let _ = writeln!(out, "{:>50} | {:8.2} |", "TOTAL", total as f64 / GIB);
    out
}

pub fn render_games(games: &[AppManifest], format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Normal => {
            if games.is_empty() {
                out.push_str("❌ No games found\n");
            }
            out.push_str(&render_table(games));
        }
        OutputFormat::Plain => {
            for game in games {
                let _ = writeln!(out, "appid={}", game.app_id());
                let _ = writeln!(out, "name={}", game.name());
                let _ = writeln!(out, "size={}", game.size());
                let _ = writeln!(out, "path={}", game.install_path().display());
            }
        }
        OutputFormat::Json => out.push_str(&to_json(&games)),
        OutputFormat::Delimited(d) => {
            for game in games {
                let _ = writeln!(
                    out,
                    "{}{d}{}{d}{}{d}{}",
                    game.app_id(),
                    game.name(),
                    game.size(),
                    game.install_path().display()
                );
            }
        }
    }
    out
}

/// One row of `libraries` / `archives`.
#[derive(Clone, Debug, Serialize)]
pub struct CollectionRecord {
    pub index: usize,
    pub kind: Layout,
    pub path: PathBuf,
    pub games: usize,
    pub size: u64,
    /// On-disk usage, where the host can measure it.
    pub used: Option<u64>,
    pub free: Option<u64>,
    /// Archives only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
}

fn optional_size(size: Option<u64>) -> String {
    size.map(format_size).unwrap_or_else(|| "?".to_string())
}

pub fn render_collections(records: &[CollectionRecord], format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Normal => {
            if records.is_empty() {
                out.push_str("❌ Nothing found\n");
            }
            for r in records {
                let prefix = match r.kind {
                    Layout::Library => "lib",
                    Layout::Archive => "archive",
                };
                let _ = writeln!(out, "📂 [{}:{}] {}", prefix, r.index, r.path.display());
                let _ = write!(
                    out,
                    "   {} games, {} declared, {} on disk, {} free",
                    r.games,
                    format_size(r.size),
                    optional_size(r.used),
                    optional_size(r.free)
                );
                if let Some(max) = r.max_size {
                    let _ = write!(out, ", room for {}", format_size(max));
                }
                out.push('\n');
            }
        }
        OutputFormat::Plain => {
            for r in records {
                let _ = writeln!(out, "index={}", r.index);
                let _ = writeln!(out, "path={}", r.path.display());
                let _ = writeln!(out, "games={}", r.games);
                let _ = writeln!(out, "size={}", r.size);
                let _ = writeln!(out, "used={}", r.used.map(|u| u.to_string()).unwrap_or_default());
                let _ = writeln!(out, "free={}", r.free.map(|f| f.to_string()).unwrap_or_default());
            }
        }
        OutputFormat::Json => out.push_str(&to_json(&records)),
        OutputFormat::Delimited(d) => {
            for r in records {
                let _ = writeln!(
                    out,
                    "{}{d}{}{d}{}{d}{}",
                    r.index,
                    r.path.display(),
                    r.games,
                    r.size
                );
            }
        }
    }
    out
}

fn signed_size(delta: i64) -> String {
    let sign = if delta < 0 { "-" } else { "+" };
    format!("{}{}", sign, format_size(delta.unsigned_abs()))
}

fn delta_text(delta: &SizeDelta) -> String {
    match delta {
        SizeDelta::Unknown => "unknown".to_string(),
        SizeDelta::Bytes(bytes) => bytes.to_string(),
    }
}

pub fn render_issues(report: &IssueReport, format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Normal => {
            if !report.orphan_directories.is_empty() {
                out.push_str("❓ Directories without a manifest:\n");
                for dir in &report.orphan_directories {
                    let _ = writeln!(out, "   {}", dir);
                }
            }
            if !report.dangling_manifests.is_empty() {
                out.push_str("❓ Manifests without data:\n");
                for m in &report.dangling_manifests {
                    let _ = writeln!(out, "   [{}] {} ({})", m.app_id(), m.name(), m.path().display());
                }
            }
            if !report.size_discrepancies.games.is_empty() {
                out.push_str("⚠️  Size discrepancies (declared - on disk):\n");
                for (name, delta) in &report.size_discrepancies.games {
                    let text = match delta {
                        SizeDelta::Unknown => "no size recorded".to_string(),
                        SizeDelta::Bytes(bytes) => signed_size(*bytes),
                    };
                    let _ = writeln!(out, "   {}: {}", name, text);
                }
            }
            if !report.redundant_data.is_empty() {
                out.push_str("📦 Archived games still installed:\n");
                for copy in &report.redundant_data {
                    let _ = writeln!(out, "   {} in {}", copy.installed.name(), copy.library.display());
                }
            }
            if report.is_clean() {
                out.push_str("✅ No issues found\n");
            }
            let _ = writeln!(
                out,
                "   Library total: {}",
                signed_size(report.size_discrepancies.library)
            );
        }
        OutputFormat::Plain => {
            for dir in &report.orphan_directories {
                let _ = writeln!(out, "orphan={}", dir);
            }
            for m in &report.dangling_manifests {
                let _ = writeln!(out, "dangling={}", m.path().display());
            }
            for (name, delta) in &report.size_discrepancies.games {
                let _ = writeln!(out, "size[{}]={}", name, delta_text(delta));
            }
            let _ = writeln!(out, "size[lib]={}", report.size_discrepancies.library);
            for copy in &report.redundant_data {
                let _ = writeln!(out, "redundant[{}]={}", copy.installed.name(), copy.library.display());
            }
        }
        OutputFormat::Json => out.push_str(&to_json(report)),
        OutputFormat::Delimited(d) => {
            for dir in &report.orphan_directories {
                let _ = writeln!(out, "orphan{d}{}", dir);
            }
            for m in &report.dangling_manifests {
                let _ = writeln!(out, "dangling{d}{}", m.name());
            }
            for (name, delta) in &report.size_discrepancies.games {
                let _ = writeln!(out, "size{d}{}{d}{}", name, delta_text(delta));
            }
            let _ = writeln!(out, "size{d}lib{d}{}", report.size_discrepancies.library);
            for copy in &report.redundant_data {
                let _ = writeln!(out, "redundant{d}{}{d}{}", copy.installed.name(), copy.library.display());
            }
        }
    }
    out
}

pub fn render_removals(removals: &[Removal], format: &OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Json => out.push_str(&to_json(&removals)),
        _ => {
            if removals.is_empty() && *format == OutputFormat::Normal {
                out.push_str("❌ Nothing matched\n");
            }
            for removal in removals {
                let line = match (removal, format) {
                    (Removal::Removed(name), OutputFormat::Normal) => format!("🗑️  Removed {}", name),
                    (Removal::DanglingManifest(name), OutputFormat::Normal) => {
                        format!("🗑️  Removed {} (data was already gone)", name)
                    }
                    (Removal::Removed(name), _) => format!("removed={}", name),
                    (Removal::DanglingManifest(name), _) => format!("dangling={}", name),
                };
                out.push_str(&line);
                out.push('\n');
            }
        }
    }
    out
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(json) => json + "\n",
        Err(e) => {
            log::error!("could not serialize output: {}", e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::library::Library;
    use crate::test_helpers::{write_game_data, write_manifest};
    use std::fs;
    use tempfile::tempdir;

    fn games(dir: &std::path::Path) -> Vec<AppManifest> {
        let library = Library::new(dir);
        write_manifest(&library.apps_path(), 379720, Some("DOOM"), "DOOM", 73756206574);
        write_manifest(&library.apps_path(), 620, Some("portal 2"), "Portal 2", 12 * 1024 * 1024 * 1024);
        write_manifest(&library.apps_path(), 70, Some("Half-Life"), "Half-Life", 512 * 1024 * 1024);
        library.games().unwrap()
    }

    #[test]
    fn test_table_has_doom_row_and_total() {
        let dir = tempdir().unwrap();
        let mut games = games(dir.path());
        sort_games(&mut games, SortKey::SizeDesc);
        let table = render_table(&games);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(
            lines[0],
            format!("{:>50} | {:8.2} | 379720", "DOOM", 73756206574f64 / GIB)
        );
        assert!(lines[0].ends_with("|    68.69 | 379720"));
        assert!(lines.last().unwrap().contains("TOTAL"));
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_long_names_are_cut_to_the_column() {
        let dir = tempdir().unwrap();
        let library = Library::new(dir.path());
        let long = "A".repeat(60);
        write_manifest(&library.apps_path(), 1, Some(&long), "Long", 1024);
        let table = render_table(&library.games().unwrap());
        let row = table.lines().next().unwrap();

        assert_eq!(row, format!("{}... | {:8.2} | 1", "A".repeat(47), 1024f64 / GIB));
        assert_eq!(row.find('|'), table.lines().last().unwrap().find('|'));
        assert_eq!(fit_name(&"B".repeat(50)), "B".repeat(50));
    }

    #[test]
    fn test_sort_keys() {
        let dir = tempdir().unwrap();
        let mut games = games(dir.path());
        let names = |g: &[AppManifest]| g.iter().map(AppManifest::name).collect::<Vec<_>>();

        sort_games(&mut games, SortKey::Name);
        assert_eq!(names(&games), ["DOOM", "Half-Life", "portal 2"]);
        sort_games(&mut games, SortKey::Size);
        assert_eq!(names(&games), ["Half-Life", "portal 2", "DOOM"]);
        sort_games(&mut games, SortKey::Id);
        assert_eq!(names(&games), ["Half-Life", "portal 2", "DOOM"]);
        assert_eq!(SortKey::from_str("name.lower", false), Ok(SortKey::NameLower));
    }

    #[test]
    fn test_json_games() {
        let dir = tempdir().unwrap();
        let games = games(dir.path());
        let json: serde_json::Value =
            serde_json::from_str(&render_games(&games, &OutputFormat::Json)).unwrap();
        let doom = json
            .as_array()
            .unwrap()
            .iter()
            .find(|g| g["id"] == 379720)
            .unwrap();
        assert_eq!(doom["name"], "DOOM");
        assert_eq!(doom["store_url"], "https://store.steampowered.com/app/379720");
    }

    #[test]
    fn test_issue_rendering() {
        let dir = tempdir().unwrap();
        let library = Library::new(dir.path());
        write_manifest(&library.apps_path(), 1, Some("Sizeless"), "Sizeless", 0);
        write_game_data(&library.install_path().join("Sizeless"), 10);
        fs::create_dir_all(library.install_path().join("UnknownGame")).unwrap();
        let report = library.detect_issues().unwrap();

        let normal = render_issues(&report, &OutputFormat::Normal);
        assert!(normal.contains("UnknownGame"));
        assert!(normal.contains("Sizeless: no size recorded"));
        assert!(!normal.contains("No issues found"));

        let plain = render_issues(&report, &OutputFormat::Plain);
        assert!(plain.contains("orphan=UnknownGame\n"));
        assert!(plain.contains("size[Sizeless]=unknown\n"));
        assert!(plain.contains("size[lib]=-10\n"));

        let json: serde_json::Value =
            serde_json::from_str(&render_issues(&report, &OutputFormat::Json)).unwrap();
        assert_eq!(json["orphan_directories"][0], "UnknownGame");
        assert_eq!(json["size_discrepancies"]["games"]["Sizeless"], "unknown");
    }

    #[test]
    fn test_determine_format() {
        assert_eq!(determine_format(true, true, &None), OutputFormat::Json);
        assert_eq!(determine_format(false, true, &None), OutputFormat::Plain);
        assert_eq!(
            determine_format(false, false, &Some(",".into())),
            OutputFormat::Delimited(",".into())
        );
        assert_eq!(determine_format(false, false, &None), OutputFormat::Normal);
    }
}
