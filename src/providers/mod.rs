//! Install providers, one per package-manager family.
//!
//! A [`Provider`] knows how to install, update and uninstall agents with one
//! family of tools. [`NativeProvider`] runs catalog command lines verbatim; the
//! others build their own invocations and know how to query their registry.

pub mod brew;
pub mod native;
pub mod npm;
pub mod pip;
pub mod winget;

pub use brew::BrewProvider;
pub use native::NativeProvider;
pub use npm::NpmProvider;
pub use pip::PipProvider;
pub use winget::WingetProvider;

use crate::agents::{AgentDef, InstallMethod, InstallMethodDef, InstallResult, Installation};
use crate::error::{InstallError, Result};
use crate::platform::Platform;
use crate::utils::process::{self, ExecContext};
use crate::version::Version;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Capability set shared by every provider.
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Primary method this provider serves.
    fn method(&self) -> InstallMethod;

    fn is_available(&self) -> bool;

    fn install(
        &self,
        ctx: &ExecContext,
        agent: &AgentDef,
        method: &InstallMethodDef,
        force: bool,
    ) -> Result<InstallResult>;

    fn update(
        &self,
        ctx: &ExecContext,
        installation: &Installation,
        agent: &AgentDef,
        method: &InstallMethodDef,
    ) -> Result<InstallResult>;

    fn uninstall(
        &self,
        ctx: &ExecContext,
        installation: &Installation,
        method: &InstallMethodDef,
    ) -> Result<()>;

    /// Latest version published in the provider's registry.
    fn latest_version(&self, _ctx: &ExecContext, _method: &InstallMethodDef) -> Result<Version> {
        Err(InstallError::NotSupported(format!(
            "{} has no registry to query for the latest version",
            self.name()
        )))
    }
}

/// Pull a version-looking token out of free-form command output.
///
/// Prefers a line mentioning "version" and takes its first token that starts
/// with a digit (or `v` plus a digit, with the `v` dropped). Otherwise takes
/// the first digit-led token anywhere. Returns an empty string when nothing
/// matches.
pub fn extract_version_string(output: &str) -> String {
    let version_line = output
        .lines()
        .find(|line| line.to_lowercase().contains("version"));

    if let Some(line) = version_line {
        for token in line.split_whitespace() {
            if starts_with_digit(token) {
                return token.to_string();
            }
            if let Some(rest) = token.strip_prefix('v').or_else(|| token.strip_prefix('V')) {
                if starts_with_digit(rest) {
                    return rest.to_string();
                }
            }
        }
    }

    output
        .split_whitespace()
        .find(|token| starts_with_digit(token))
        .map(str::to_string)
        .unwrap_or_default()
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Turn version command output into a [`Version`].
///
/// `pattern` (the catalog's `version_regex`) wins when it matches; its first
/// capture group is used if present. Nothing found gives a zero version; text
/// that is found but does not parse is kept as an unparsed reading.
pub fn version_from_output(output: &str, pattern: &str) -> Version {
    let from_pattern = if pattern.is_empty() {
        None
    } else {
        match Regex::new(pattern) {
            Ok(re) => re.captures(output).and_then(|caps| {
                caps.get(1)
                    .or_else(|| caps.get(0))
                    .map(|m| m.as_str().to_string())
            }),
            Err(e) => {
                warn!(pattern, error = %e, "ignoring invalid version regex");
                None
            }
        }
    };

    let text = from_pattern.unwrap_or_else(|| extract_version_string(output));
    if text.is_empty() {
        return Version::default();
    }
    Version::parse(&text).unwrap_or_else(|_| Version::unparsed(text))
}

/// Run the agent's version command and read its version.
///
/// A failing version command yields a zero version; only cancellation and
/// timeouts are propagated.
pub fn detect_version(ctx: &ExecContext, platform: &dyn Platform, agent: &AgentDef) -> Result<Version> {
    let cmd = agent.detection.version_cmd.trim();
    if cmd.is_empty() {
        return Ok(Version::default());
    }

    match process::run_shell(ctx, platform, cmd) {
        Ok(out) => {
            let version = version_from_output(&out.combined(), &agent.detection.version_regex);
            debug!(agent = %agent.id, %version, "detected version");
            Ok(version)
        }
        Err(e @ (InstallError::Cancelled(_) | InstallError::Timeout { .. })) => Err(e),
        Err(e) => {
            warn!(agent = %agent.id, error = %e, "version command failed");
            Ok(Version::default())
        }
    }
}

/// First of the agent's executables found on PATH.
pub fn locate_executable(platform: &dyn Platform, agent: &AgentDef) -> Option<PathBuf> {
    agent
        .detection
        .executables
        .iter()
        .find_map(|name| platform.find_executable(name))
}

/// First of `names` found on PATH.
pub(crate) fn find_tool(platform: &dyn Platform, names: &[&str]) -> Option<PathBuf> {
    names.iter().find_map(|name| platform.find_executable(name))
}

/// Package identifier from `method.package`, else parsed from its command.
pub(crate) fn package_or_else(
    method: &InstallMethodDef,
    parse: impl FnOnce(&str) -> Option<String>,
) -> Result<String> {
    if !method.package.trim().is_empty() {
        return Ok(method.package.trim().to_string());
    }
    parse(&method.command).ok_or_else(|| {
        InstallError::NoCommandSpecified(format!(
            "{} method has no package and none could be read from {:?}",
            method.method, method.command
        ))
    })
}

/// Result skeleton filled in after a successful install or update.
pub(crate) fn new_result(
    platform: &dyn Platform,
    agent: &AgentDef,
    method: &InstallMethodDef,
    version: Version,
    output: String,
    duration: Duration,
) -> InstallResult {
    let executable_path = locate_executable(platform, agent);
    let install_path = executable_path
        .as_ref()
        .and_then(|p| p.parent())
        .map(|p| p.to_path_buf());
    InstallResult {
        agent_id: agent.id.clone(),
        agent_name: agent.name.clone(),
        method: method.method.clone(),
        version,
        from_version: None,
        install_path,
        executable_path,
        duration,
        output,
        was_updated: false,
    }
}

/// First token after `keyword` that is not a flag, skipping values of
/// flags listed in `valued_flags`.
pub(crate) fn token_after<'a>(
    tokens: &[&'a str],
    keywords: &[&str],
    valued_flags: &[&str],
) -> Option<&'a str> {
    let start = tokens.iter().position(|t| keywords.contains(t))?;
    let mut iter = tokens[start + 1..].iter();
    while let Some(token) = iter.next() {
        if token.starts_with('-') {
            if !token.contains('=') && valued_flags.contains(token) {
                iter.next();
            }
            continue;
        }
        if is_shell_operator(token) {
            return None;
        }
        return Some(token);
    }
    None
}

fn is_shell_operator(token: &str) -> bool {
    matches!(token, "&&" | "||" | "|" | ";" | "&")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// Platform with a fixed ID and a fake PATH.
    pub struct FakePlatform {
        pub id: String,
        pub executables: HashMap<String, PathBuf>,
    }

    impl FakePlatform {
        pub fn new(id: &str, executables: &[&str]) -> Self {
            Self {
                id: id.to_string(),
                executables: executables
                    .iter()
                    .map(|e| (e.to_string(), PathBuf::from(format!("/fake/bin/{}", e))))
                    .collect(),
            }
        }

        /// Resolve `name` to a real file, such as a stub script.
        pub fn with_executable(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
            self.executables.insert(name.to_string(), path.into());
            self
        }
    }

    /// Write an executable shell script `name` into `dir`.
    #[cfg(unix)]
    pub fn stub_script(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    impl Platform for FakePlatform {
        fn id(&self) -> &str {
            &self.id
        }

        fn shell(&self) -> &str {
            "sh"
        }

        fn shell_arg(&self) -> &str {
            "-c"
        }

        fn find_executable(&self, name: &str) -> Option<PathBuf> {
            self.executables.get(name).cloned()
        }
    }
}
