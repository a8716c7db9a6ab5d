//! Catalog-supplied agent definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An agent and the ways it can be installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDef {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Install methods keyed by name, in catalog order
    #[serde(default)]
    pub install_methods: IndexMap<String, InstallMethodDef>,

    #[serde(default)]
    pub detection: Detection,
}

/// One way of installing an agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallMethodDef {
    /// Method name, e.g. `npm` or `brew-cask`
    pub method: String,

    /// Package identifier in the method's registry
    #[serde(default)]
    pub package: String,

    /// Install command line
    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub update_cmd: String,

    #[serde(default)]
    pub uninstall_cmd: String,

    /// Platform IDs this method works on (`darwin`, `linux`, `windows`)
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl InstallMethodDef {
    pub fn supports_platform(&self, platform_id: &str) -> bool {
        self.platforms.iter().any(|p| p == platform_id)
    }
}

/// How to find an installed copy and read its version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Detection {
    #[serde(default)]
    pub executables: Vec<String>,

    #[serde(default)]
    pub version_cmd: String,

    /// Optional regex applied to the version command output
    #[serde(default)]
    pub version_regex: String,
}

impl AgentDef {
    pub fn method(&self, name: &str) -> Option<&InstallMethodDef> {
        self.install_methods.get(name)
    }
}
