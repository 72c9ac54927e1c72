use std::collections::BTreeSet;
use std::process::Command;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::{Error, Result};

/// Answers "is this program running right now?".
pub trait ProcessProbe {
    /// Names of all processes currently visible to us.
    fn running_processes(&self) -> Result<BTreeSet<String>>;

    /// Whether names should be compared ignoring case (Windows-class hosts).
    fn case_insensitive(&self) -> bool;

    fn is_running(&self, name: &str) -> Result<bool> {
        let processes = self.running_processes()?;
        if self.case_insensitive() {
            let wanted = name.to_lowercase();
            Ok(processes.iter().any(|p| p.to_lowercase() == wanted))
        } else {
            Ok(processes.contains(name))
        }
    }
}

/// Process table read through `sysinfo`.
pub struct SysinfoProcesses {
    case_insensitive: bool,
}

impl SysinfoProcesses {
    pub fn case_sensitive() -> Self {
        Self {
            case_insensitive: false,
        }
    }

    pub fn case_insensitive() -> Self {
        Self {
            case_insensitive: true,
        }
    }
}

impl ProcessProbe for SysinfoProcesses {
    fn running_processes(&self) -> Result<BTreeSet<String>> {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );
        Ok(system
            .processes()
            .values()
            .map(|process| process.name().to_string_lossy().into_owned())
            .collect())
    }

    fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

/// Under WSL, Steam runs on the Windows host, so ask `tasklist.exe` as well
/// as the local process table.
pub struct WslProcesses;

impl WslProcesses {
    fn run(command: &mut Command) -> Result<String> {
        let output = command.output()?;
        if !output.status.success() {
            return Err(Error::Io(std::io::Error::other(format!(
                "{:?} exited with {}",
                command, output.status
            ))));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ProcessProbe for WslProcesses {
    fn running_processes(&self) -> Result<BTreeSet<String>> {
        let host = Self::run(&mut Command::new("tasklist.exe"))?;
        let user = std::env::var("USER").unwrap_or_default();
        let local = Self::run(Command::new("ps").args(["-o", "comm=", "-u", &user]))?;

        let mut names = parse_tasklist(&host);
        names.extend(local.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from));
        Ok(names)
    }

    fn case_insensitive(&self) -> bool {
        true
    }
}

/// First column of `tasklist.exe` output, skipping the header rows.
fn parse_tasklist(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|name| !name.starts_with('=') && *name != "Image")
        .map(String::from)
        .collect()
}
