//! Host platform abstraction: identity, shell, executable lookup.

use std::path::PathBuf;

/// What the engine needs to know about the machine it runs on.
pub trait Platform: Send + Sync {
    /// Platform identifier matched against `InstallMethodDef::platforms`
    /// (`darwin`, `linux` or `windows`).
    fn id(&self) -> &str;

    /// Shell used to run catalog command lines.
    fn shell(&self) -> &str;

    /// Argument that makes [`Platform::shell`] run a command string.
    fn shell_arg(&self) -> &str;

    fn find_executable(&self, name: &str) -> Option<PathBuf>;

    fn is_executable_in_path(&self, name: &str) -> bool {
        self.find_executable(name).is_some()
    }
}

/// Map a Rust target OS name to a catalog platform ID.
pub fn platform_id(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

/// The machine the process is running on.
#[derive(Debug, Clone)]
pub struct HostPlatform {
    id: String,
    shell: String,
    shell_arg: String,
}

impl HostPlatform {
    pub fn new() -> Self {
        let (shell, shell_arg) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        Self {
            id: platform_id(std::env::consts::OS).to_string(),
            shell: shell.to_string(),
            shell_arg: shell_arg.to_string(),
        }
    }

    /// Override the shell used for command lines
    pub fn with_shell(mut self, shell: impl Into<String>, shell_arg: impl Into<String>) -> Self {
        self.shell = shell.into();
        self.shell_arg = shell_arg.into();
        self
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for HostPlatform {
    fn id(&self) -> &str {
        &self.id
    }

    fn shell(&self) -> &str {
        &self.shell
    }

    fn shell_arg(&self) -> &str {
        &self.shell_arg
    }

    fn find_executable(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}
