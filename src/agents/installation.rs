//! Installed-copy snapshots and operation results.

use crate::version::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// A detected, installed copy of an agent.
///
/// `latest_version` is `None` when the latest version is unknown, which is
/// different from a known latest version equal to the installed one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    pub agent_id: String,
    pub agent_name: String,
    pub method: String,
    pub installed_version: Version,

    #[serde(default)]
    pub latest_version: Option<Version>,

    #[serde(default)]
    pub executable_path: Option<PathBuf>,

    #[serde(default)]
    pub install_path: Option<PathBuf>,

    #[serde(default)]
    pub is_global: bool,

    pub detected_at: DateTime<Utc>,
    pub last_checked: DateTime<Utc>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Installation {
    pub fn new(agent_id: &str, agent_name: &str, method: &str, installed_version: Version) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id.to_string(),
            agent_name: agent_name.to_string(),
            method: method.to_string(),
            installed_version,
            latest_version: None,
            executable_path: None,
            install_path: None,
            is_global: false,
            detected_at: now,
            last_checked: now,
            metadata: HashMap::new(),
        }
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Record a freshly queried latest version.
    pub fn with_latest(mut self, latest: Version) -> Self {
        self.latest_version = Some(latest);
        self.last_checked = Utc::now();
        self
    }

    /// True only when the latest version is known and newer than the installed one.
    pub fn has_update(&self) -> bool {
        self.latest_version
            .as_ref()
            .is_some_and(|latest| latest.is_newer_than(&self.installed_version))
    }
}

/// Outcome of an install or update.
///
/// `from_version` and `was_updated` only carry meaning for updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallResult {
    pub agent_id: String,
    pub agent_name: String,
    pub method: String,
    pub version: Version,
    pub from_version: Option<Version>,
    pub install_path: Option<PathBuf>,
    pub executable_path: Option<PathBuf>,
    pub duration: Duration,
    pub output: String,
    pub was_updated: bool,
}
