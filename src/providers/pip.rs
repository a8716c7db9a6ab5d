//! Python packages through pip, pipx or uv.

use super::{detect_version, find_tool, new_result, package_or_else, token_after, Provider};
use crate::agents::{AgentDef, InstallMethod, InstallMethodDef, InstallResult, Installation};
use crate::error::{InstallError, Result};
use crate::platform::Platform;
use crate::utils::process::{self, ExecContext};
use crate::version::Version;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Flags whose next token is a value, not the package.
const VALUED_FLAGS: &[&str] = &[
    "-i",
    "--index-url",
    "--extra-index-url",
    "-p",
    "--python",
    "--with",
    "-r",
    "--requirement",
    "-c",
    "--constraint",
    "--target",
    "--prefix",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipTool {
    Pip,
    Pipx,
    Uv,
}

impl PipTool {
    fn from_method(method: &str) -> Result<Self> {
        match method.parse::<InstallMethod>()? {
            InstallMethod::Pip => Ok(PipTool::Pip),
            InstallMethod::Pipx => Ok(PipTool::Pipx),
            InstallMethod::Uv => Ok(PipTool::Uv),
            other => Err(InstallError::UnsupportedMethod(format!(
                "{} is not a pip-family method",
                other
            ))),
        }
    }

    fn executables(&self) -> &'static [&'static str] {
        match self {
            PipTool::Pip => &["pip", "pip3"],
            PipTool::Pipx => &["pipx"],
            PipTool::Uv => &["uv"],
        }
    }

    fn install_args<'a>(&self, package: &'a str, force: bool) -> Vec<&'a str> {
        let mut args = match self {
            PipTool::Pip => vec!["install", package],
            PipTool::Pipx => vec!["install", package],
            PipTool::Uv => vec!["tool", "install", package],
        };
        if force {
            args.push(match self {
                PipTool::Pip => "--force-reinstall",
                PipTool::Pipx | PipTool::Uv => "--force",
            });
        }
        args
    }

    fn upgrade_args<'a>(&self, package: &'a str) -> Vec<&'a str> {
        match self {
            PipTool::Pip => vec!["install", "--upgrade", package],
            PipTool::Pipx => vec!["upgrade", package],
            PipTool::Uv => vec!["tool", "upgrade", package],
        }
    }

    fn uninstall_args<'a>(&self, package: &'a str) -> Vec<&'a str> {
        match self {
            PipTool::Pip => vec!["uninstall", "-y", package],
            PipTool::Pipx => vec!["uninstall", package],
            PipTool::Uv => vec!["tool", "uninstall", package],
        }
    }
}

pub struct PipProvider {
    platform: Arc<dyn Platform>,
}

impl PipProvider {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    /// Whether the specific tool behind `method` (pip, pipx or uv) is usable.
    pub fn is_method_available(&self, method: InstallMethod) -> bool {
        match PipTool::from_method(method.as_str()) {
            Ok(tool) => find_tool(self.platform.as_ref(), tool.executables()).is_some(),
            Err(_) => false,
        }
    }

    fn tool_path(&self, tool: PipTool) -> Result<PathBuf> {
        find_tool(self.platform.as_ref(), tool.executables()).ok_or_else(|| {
            InstallError::unavailable(
                self.name(),
                format!("none of {:?} found in PATH", tool.executables()),
            )
        })
    }

    fn run(&self, ctx: &ExecContext, tool: PipTool, args: &[&str]) -> Result<process::CommandOutput> {
        process::run_program(ctx, &self.tool_path(tool)?, args)?.checked()
    }

    /// Version of an installed package according to the tool that manages it.
    fn installed_version(&self, ctx: &ExecContext, tool: PipTool, package: &str) -> Result<Version> {
        let parsed = match tool {
            PipTool::Pip => {
                let out = self.run(ctx, tool, &["show", package])?;
                parse_show_output(&out.stdout)
            }
            PipTool::Pipx => {
                let out = self.run(ctx, tool, &["list", "--short"])?;
                parse_list_output(&out.stdout, package)
            }
            PipTool::Uv => {
                let out = self.run(ctx, tool, &["tool", "list"])?;
                parse_list_output(&out.stdout, package)
            }
        };
        parsed.ok_or_else(|| InstallError::PackageNotFound(package.to_string()))
    }

    fn installed_or_detected(
        &self,
        ctx: &ExecContext,
        tool: PipTool,
        agent: &AgentDef,
        package: &str,
    ) -> Result<Version> {
        match self.installed_version(ctx, tool, package) {
            Ok(v) => Ok(v),
            Err(e @ (InstallError::Cancelled(_) | InstallError::Timeout { .. })) => Err(e),
            Err(e) => {
                debug!(package, error = %e, "package query failed, falling back to detection");
                detect_version(ctx, self.platform.as_ref(), agent)
            }
        }
    }
}

impl Provider for PipProvider {
    fn name(&self) -> &'static str {
        "pip"
    }

    fn method(&self) -> InstallMethod {
        InstallMethod::Pip
    }

    fn is_available(&self) -> bool {
        find_tool(self.platform.as_ref(), &["pip", "pip3", "pipx", "uv"]).is_some()
    }

    fn install(
        &self,
        ctx: &ExecContext,
        agent: &AgentDef,
        method: &InstallMethodDef,
        force: bool,
    ) -> Result<InstallResult> {
        let tool = PipTool::from_method(&method.method)?;
        let package = package_or_else(method, parse_package_name)?;
        let started = Instant::now();
        info!(agent = %agent.id, package, tool = ?tool, "pip install");

        let out = self.run(ctx, tool, &tool.install_args(&package, force))?;

        let version = self.installed_or_detected(ctx, tool, agent, &package)?;
        Ok(new_result(
            self.platform.as_ref(),
            agent,
            method,
            version,
            out.stdout,
            started.elapsed(),
        ))
    }

    fn update(
        &self,
        ctx: &ExecContext,
        installation: &Installation,
        agent: &AgentDef,
        method: &InstallMethodDef,
    ) -> Result<InstallResult> {
        let tool = PipTool::from_method(&method.method)?;
        let package = package_or_else(method, parse_package_name)?;
        let started = Instant::now();
        info!(agent = %agent.id, package, tool = ?tool, "pip upgrade");

        let out = self.run(ctx, tool, &tool.upgrade_args(&package))?;

        let version = self.installed_or_detected(ctx, tool, agent, &package)?;
        let old = installation.installed_version.clone();
        let mut result = new_result(
            self.platform.as_ref(),
            agent,
            method,
            version,
            out.stdout,
            started.elapsed(),
        );
        result.was_updated = result.version.is_newer_than(&old);
        result.from_version = Some(old);
        Ok(result)
    }

    fn uninstall(
        &self,
        ctx: &ExecContext,
        installation: &Installation,
        method: &InstallMethodDef,
    ) -> Result<()> {
        let tool = PipTool::from_method(&method.method)?;
        let package = package_or_else(method, parse_package_name)?;
        info!(agent = %installation.agent_id, package, tool = ?tool, "pip uninstall");
        self.run(ctx, tool, &tool.uninstall_args(&package))?;
        Ok(())
    }

    /// Latest release on PyPI, via `pip index versions`.
    fn latest_version(&self, ctx: &ExecContext, method: &InstallMethodDef) -> Result<Version> {
        let package = package_or_else(method, parse_package_name)?;
        let out = self.run(ctx, PipTool::Pip, &["index", "versions", package.as_str()])?;
        parse_index_versions(&out.stdout).ok_or(InstallError::PackageNotFound(package))
    }
}

/// Package named after `install` in a pip, pipx or `uv tool` command line,
/// with flags and version specifiers removed.
pub fn parse_package_name(command: &str) -> Option<String> {
    let tokens: Vec<&str> = command.split_whitespace().collect();
    let token = token_after(&tokens, &["install"], VALUED_FLAGS)?;
    let token = token.trim_matches(|c| c == '"' || c == '\'');
    let end = token
        .find(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~' | '[' | ';' | '@'))
        .unwrap_or(token.len());
    let name = token[..end].trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// PyPI treats `_`, `.` and `-` alike and ignores case.
fn normalize(name: &str) -> String {
    name.to_lowercase().replace(['_', '.'], "-")
}

/// `Version: 1.2.3` line of `pip show`.
fn parse_show_output(output: &str) -> Option<Version> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("Version:"))
        .and_then(|v| Version::parse(v.trim()).ok())
}

/// `<package> <version>` rows of `pipx list --short` and `uv tool list`.
fn parse_list_output(output: &str, package: &str) -> Option<Version> {
    let wanted = normalize(package);
    output.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let name = parts.next()?;
        if normalize(name) != wanted {
            return None;
        }
        Version::parse(parts.next()?).ok()
    })
}

/// `name (1.2.3)` header of `pip index versions`.
fn parse_index_versions(output: &str) -> Option<Version> {
    let line = output.lines().find(|l| l.contains('('))?;
    let start = line.find('(')? + 1;
    let end = start + line[start..].find(')')?;
    Version::parse(&line[start..end]).ok()
}
