use crate::agents::AgentCatalog;
use crate::cli::Cli;
use crate::error::{InstallError, Result};
use crate::platform::{HostPlatform, Platform};
use crate::utils::process::ExecContext;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = ".agent-manager.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub exec: ExecConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Debug logging (not stored in config file)
    #[serde(skip)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Per external command; 0 disables the limit
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell_arg: Option<String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            shell: None,
            shell_arg: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// Catalog file replacing the builtin one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration with precedence:
    /// 1. CLI flags (applied later via with_cli_overrides)
    /// 2. Environment variables
    /// 3. Global config (~/.agent-manager.toml)
    /// 4. Built-in defaults
    pub fn load() -> Result<Self> {
        Self::load_from_home(home_dir().as_deref())
    }

    fn load_from_home(home: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = home {
            let global_config = home.join(CONFIG_FILE);
            if global_config.exists() {
                config = config.merge(Self::from_file(&global_config)?);
            }
        }

        config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(mut self, other: Self) -> Self {
        if other.exec.timeout_secs != default_timeout_secs() {
            self.exec.timeout_secs = other.exec.timeout_secs;
        }
        if other.exec.shell.is_some() {
            self.exec.shell = other.exec.shell;
        }
        if other.exec.shell_arg.is_some() {
            self.exec.shell_arg = other.exec.shell_arg;
        }
        if other.catalog.path.is_some() {
            self.catalog.path = other.catalog.path;
        }
        self
    }

    /// Apply environment variable overrides
    fn merge_env(mut self) -> Self {
        if let Ok(timeout) = std::env::var("AGENT_MANAGER_TIMEOUT") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.exec.timeout_secs = timeout;
            }
        }

        if let Ok(shell) = std::env::var("AGENT_MANAGER_SHELL") {
            if !shell.trim().is_empty() {
                self.exec.shell = Some(shell);
            }
        }

        if let Ok(catalog) = std::env::var("AGENT_MANAGER_CATALOG") {
            if !catalog.trim().is_empty() {
                self.catalog.path = Some(PathBuf::from(catalog));
            }
        }

        self
    }

    /// Apply CLI overrides (highest precedence)
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        self.verbose = cli.verbose;
        if let Some(timeout) = cli.timeout {
            self.exec.timeout_secs = timeout;
        }
        if let Some(catalog) = &cli.catalog {
            self.catalog.path = Some(catalog.clone());
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if let Some(shell) = &self.exec.shell {
            if shell.trim().is_empty() {
                return Err(InstallError::InvalidConfig("exec.shell is empty".to_string()));
            }
        }
        if self.exec.shell_arg.is_some() && self.exec.shell.is_none() {
            return Err(InstallError::InvalidConfig(
                "exec.shell_arg is set but exec.shell is not".to_string(),
            ));
        }
        Ok(())
    }

    /// Fresh context with the configured timeout.
    pub fn exec_context(&self) -> ExecContext {
        match self.exec.timeout_secs {
            0 => ExecContext::background(),
            secs => ExecContext::with_timeout(Duration::from_secs(secs)),
        }
    }

    /// Host platform with any shell override applied.
    pub fn platform(&self) -> HostPlatform {
        let host = HostPlatform::new();
        match &self.exec.shell {
            Some(shell) => {
                let arg = self
                    .exec
                    .shell_arg
                    .clone()
                    .unwrap_or_else(|| host.shell_arg().to_string());
                host.with_shell(shell.clone(), arg)
            }
            None => host,
        }
    }

    /// Configured catalog file, else the builtin catalog.
    pub fn catalog(&self) -> Result<AgentCatalog> {
        match &self.catalog.path {
            Some(path) if !path.exists() => Err(InstallError::InvalidConfig(format!(
                "catalog file {} does not exist",
                path.display()
            ))),
            Some(path) => AgentCatalog::from_file(path),
            None => AgentCatalog::builtin(),
        }
    }
}

/// Get the home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(PathBuf::from)
}
