use std::collections::BTreeMap;

use which::which;

pub fn command_available(command: &str) -> bool {
    which(command).is_ok()
}

/// Availability of each registered copy tool, keyed by name.
pub fn scan_clone_tools() -> BTreeMap<String, bool> {
    crate::host::clone::registry()
        .into_iter()
        .map(|(name, constructor)| (name.to_string(), constructor().is_available()))
        .collect()
}
