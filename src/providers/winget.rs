//! Windows Package Manager.

use super::{detect_version, find_tool, new_result, package_or_else, token_after, Provider};
use crate::agents::{AgentDef, InstallMethod, InstallMethodDef, InstallResult, Installation};
use crate::error::{InstallError, Result};
use crate::platform::Platform;
use crate::utils::process::{self, ExecContext};
use crate::version::Version;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const ACCEPT_AGREEMENTS: [&str; 2] = [
    "--accept-package-agreements",
    "--accept-source-agreements",
];

const NO_UPDATE_MARKER: &str = "No applicable update found";

const VALUED_FLAGS: &[&str] = &[
    "-s",
    "--source",
    "--scope",
    "-v",
    "--version",
    "-l",
    "--location",
    "-o",
    "--log",
    "--override",
    "-a",
    "--architecture",
    "--locale",
];

// Unanchored: the version sits inside a table row of `winget list`.
static TABLE_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+\.\d+(?:\.\d+)?(?:-[0-9A-Za-z.\-]+)?(?:\+[0-9A-Za-z.\-]+)?")
        .expect("winget version pattern is valid")
});

pub struct WingetProvider {
    platform: Arc<dyn Platform>,
}

impl WingetProvider {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    fn winget(&self) -> Result<PathBuf> {
        if self.platform.id() != "windows" {
            return Err(InstallError::unavailable(
                self.name(),
                "winget is only supported on Windows",
            ));
        }
        find_tool(self.platform.as_ref(), &["winget"])
            .ok_or_else(|| InstallError::unavailable(self.name(), "winget not found in PATH"))
    }

    fn run(&self, ctx: &ExecContext, args: &[&str]) -> Result<process::CommandOutput> {
        process::run_program(ctx, &self.winget()?, args)
    }

    pub fn installed_version(&self, ctx: &ExecContext, package: &str) -> Result<Version> {
        let out = self.run(ctx, &["list", package])?.checked()?;
        parse_list_output(&out.stdout, package)
            .ok_or_else(|| InstallError::PackageNotFound(package.to_string()))
    }

    fn installed_or_detected(
        &self,
        ctx: &ExecContext,
        agent: &AgentDef,
        package: &str,
    ) -> Result<Version> {
        match self.installed_version(ctx, package) {
            Ok(v) => Ok(v),
            Err(e @ (InstallError::Cancelled(_) | InstallError::Timeout { .. })) => Err(e),
            Err(e) => {
                debug!(package, error = %e, "winget list failed, falling back to detection");
                detect_version(ctx, self.platform.as_ref(), agent)
            }
        }
    }
}

impl Provider for WingetProvider {
    fn name(&self) -> &'static str {
        "winget"
    }

    fn method(&self) -> InstallMethod {
        InstallMethod::Winget
    }

    /// Windows only, regardless of whether a `winget` binary can be found.
    fn is_available(&self) -> bool {
        self.platform.id() == "windows" && self.platform.is_executable_in_path("winget")
    }

    fn install(
        &self,
        ctx: &ExecContext,
        agent: &AgentDef,
        method: &InstallMethodDef,
        force: bool,
    ) -> Result<InstallResult> {
        let package = package_or_else(method, parse_package_id)?;
        let started = Instant::now();
        info!(agent = %agent.id, package, "winget install");

        let mut args = vec!["install", package.as_str()];
        args.extend(ACCEPT_AGREEMENTS);
        if force {
            args.push("--force");
        }
        let out = self.run(ctx, &args)?.checked()?;

        let version = self.installed_or_detected(ctx, agent, &package)?;
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
        let package = package_or_else(method, parse_package_id)?;
        let started = Instant::now();
        info!(agent = %agent.id, package, "winget upgrade");

        let mut args = vec!["upgrade", package.as_str()];
        args.extend(ACCEPT_AGREEMENTS);
        let out = self.run(ctx, &args)?;

        let old = installation.installed_version.clone();
        if out.stdout.contains(NO_UPDATE_MARKER) || out.stderr.contains(NO_UPDATE_MARKER) {
            info!(package, "already up to date");
            let mut result = new_result(
                self.platform.as_ref(),
                agent,
                method,
                old.clone(),
                out.stdout,
                started.elapsed(),
            );
            result.from_version = Some(old);
            return Ok(result);
        }
        let out = out.checked()?;

        let version = self.installed_or_detected(ctx, agent, &package)?;
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
        let package = package_or_else(method, parse_package_id)?;
        info!(agent = %installation.agent_id, package, "winget uninstall");
        self.run(
            ctx,
            &["uninstall", package.as_str(), "--accept-source-agreements"],
        )?
        .checked()?;
        Ok(())
    }

    /// `Version:` field of `winget show`.
    fn latest_version(&self, ctx: &ExecContext, method: &InstallMethodDef) -> Result<Version> {
        let package = package_or_else(method, parse_package_id)?;
        let out = self
            .run(ctx, &["show", package.as_str(), "--accept-source-agreements"])?
            .checked()?;
        parse_show_output(&out.stdout).ok_or(InstallError::PackageNotFound(package))
    }
}

/// Package identifier after `install`, `upgrade` or `uninstall` in a winget
/// command line.
pub fn parse_package_id(command: &str) -> Option<String> {
    let tokens: Vec<&str> = command.split_whitespace().collect();
    token_after(&tokens, &["install", "upgrade", "uninstall"], VALUED_FLAGS)
        .map(|t| t.trim_matches('"').to_string())
}

fn parse_list_output(output: &str, package: &str) -> Option<Version> {
    let line = output.lines().find(|line| line.contains(package))?;
    // Skip the package id itself, which may contain digits
    let rest = line.split_once(package).map_or(line, |(_, rest)| rest);
    let found = TABLE_VERSION_RE.find(rest)?;
    Version::parse(found.as_str()).ok()
}

fn parse_show_output(output: &str) -> Option<Version> {
    output
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("Version:"))
        .and_then(|v| Version::parse(v.trim()).ok())
}
