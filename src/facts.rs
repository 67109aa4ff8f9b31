//! Host identity detection
//!
//! Facts are gathered once at startup and treated as read-only afterwards:
//! OS id/version from `/etc/os-release`, machine architecture, the package
//! manager and service controller found on PATH, and the invoking user.
//! Tests build synthetic facts instead of probing the host.

use std::path::PathBuf;

use manifest::{OsFilter, wash};

use crate::exec;

/// Identity of the host this process is provisioning.
#[derive(Debug, Clone, Default)]
pub struct Facts {
    /// Platform family (`linux`, `macos`, `windows`).
    pub os_type: String,
    /// Distribution id, e.g. `ubuntu`.
    pub os_id: String,
    /// Distribution version id, e.g. `24.04`.
    pub os_version: String,
    /// Release codename when the distribution publishes one.
    pub codename: String,
    /// Machine architecture, e.g. `x86_64`.
    pub arch: String,
    /// Detected package manager binary name (`apt`, `dnf`, `yum`).
    pub package_manager: String,
    /// Full path of the package manager binary.
    pub package_manager_path: String,
    /// Path of `systemctl` when present.
    pub service_controller: Option<PathBuf>,
    /// Invoking user name.
    pub user: String,
    /// Invoking user's home directory.
    pub home: PathBuf,
}

impl Facts {
    /// Probe the local host.
    pub fn detect() -> Self {
        let mut facts = Self {
            os_type: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            user: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_default(),
            home: dirs::home_dir().unwrap_or_default(),
            ..Self::default()
        };

        if facts.os_type == "linux" {
            if let Ok(data) = std::fs::read_to_string("/etc/os-release") {
                parse_os_release(&data, &mut facts);
            } else {
                log::warn!("could not read /etc/os-release, os gating will not match");
            }
            for candidate in ["apt", "dnf", "yum"] {
                if let Some(path) = exec::has_exec_in_path(candidate) {
                    facts.package_manager = candidate.to_string();
                    facts.package_manager_path = path.to_string_lossy().into_owned();
                    break;
                }
            }
            facts.service_controller = exec::has_exec_in_path("systemctl");
        }

        log::debug!(
            "detected host: {} {} ({}) pm={} at {}",
            facts.os_id,
            facts.os_version,
            facts.arch,
            facts.package_manager,
            facts.package_manager_path
        );
        facts
    }

    /// Whether a step gated by `filter` may run on this host.
    pub fn can_exec_on_os(&self, filter: &OsFilter) -> bool {
        filter.matches(&self.os_id, &self.os_version)
    }
}

fn parse_os_release(data: &str, facts: &mut Facts) {
    for line in data.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key {
            "ID" => facts.os_id = wash(value),
            "VERSION_ID" => facts.os_version = wash(value),
            "VERSION_CODENAME" => facts.codename = wash(value),
            _ => {}
        }
    }
}
