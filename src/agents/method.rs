//! The closed set of install methods.

use crate::error::{InstallError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Package-manager kind an agent can be installed with.
///
/// The string form is what catalogs use; convert at the edges with
/// [`InstallMethod::as_str`] and [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallMethod {
    Npm,
    Pip,
    Pipx,
    Uv,
    Brew,
    BrewCask,
    Native,
    Curl,
    Binary,
    Bun,
    Bunx,
    Cargo,
    Go,
    Scoop,
    Chocolatey,
    Powershell,
    Winget,
    Dmg,
    Krew,
    Nix,
    Git,
}

/// Provider family that owns a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodFamily {
    Npm,
    Pip,
    Brew,
    Winget,
    Native,
}

impl InstallMethod {
    pub const ALL: [InstallMethod; 21] = [
        InstallMethod::Npm,
        InstallMethod::Pip,
        InstallMethod::Pipx,
        InstallMethod::Uv,
        InstallMethod::Brew,
        InstallMethod::BrewCask,
        InstallMethod::Native,
        InstallMethod::Curl,
        InstallMethod::Binary,
        InstallMethod::Bun,
        InstallMethod::Bunx,
        InstallMethod::Cargo,
        InstallMethod::Go,
        InstallMethod::Scoop,
        InstallMethod::Chocolatey,
        InstallMethod::Powershell,
        InstallMethod::Winget,
        InstallMethod::Dmg,
        InstallMethod::Krew,
        InstallMethod::Nix,
        InstallMethod::Git,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstallMethod::Npm => "npm",
            InstallMethod::Pip => "pip",
            InstallMethod::Pipx => "pipx",
            InstallMethod::Uv => "uv",
            InstallMethod::Brew => "brew",
            InstallMethod::BrewCask => "brew-cask",
            InstallMethod::Native => "native",
            InstallMethod::Curl => "curl",
            InstallMethod::Binary => "binary",
            InstallMethod::Bun => "bun",
            InstallMethod::Bunx => "bunx",
            InstallMethod::Cargo => "cargo",
            InstallMethod::Go => "go",
            InstallMethod::Scoop => "scoop",
            InstallMethod::Chocolatey => "chocolatey",
            InstallMethod::Powershell => "powershell",
            InstallMethod::Winget => "winget",
            InstallMethod::Dmg => "dmg",
            InstallMethod::Krew => "krew",
            InstallMethod::Nix => "nix",
            InstallMethod::Git => "git",
        }
    }

    pub fn family(&self) -> MethodFamily {
        match self {
            InstallMethod::Npm => MethodFamily::Npm,
            InstallMethod::Pip | InstallMethod::Pipx | InstallMethod::Uv => MethodFamily::Pip,
            InstallMethod::Brew | InstallMethod::BrewCask => MethodFamily::Brew,
            InstallMethod::Winget => MethodFamily::Winget,
            _ => MethodFamily::Native,
        }
    }
}

impl fmt::Display for InstallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallMethod {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self> {
        InstallMethod::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| InstallError::UnsupportedMethod(s.to_string()))
    }
}
