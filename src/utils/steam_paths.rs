use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// Possible Steam install roots on a native Linux host.
///
/// Checks the usual locations under the user's home directory and returns
/// the ones that hold a `steamapps` directory, deduplicated by canonical path.
pub fn steam_base_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut seen = HashSet::new();

    if let Some(home) = dirs_next::home_dir() {
        let candidates = [
            home.join(".steam/steam"),
            home.join(".local/share/Steam"),
            home.join(".steam/root"),
            home.join(".steam/debian-installation"),
            home.join(".var/app/com.valvesoftware.Steam/.local/share/Steam"),
        ];

        for cand in candidates.iter() {
            if cand.join("steamapps").is_dir() {
                let canon = fs::canonicalize(cand).unwrap_or_else(|_| cand.clone());
                if seen.insert(canon.clone()) {
                    dirs.push(canon);
                }
            }
        }
    }

    dirs
}
