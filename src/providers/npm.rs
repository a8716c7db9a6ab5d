//! Global npm packages.

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

pub struct NpmProvider {
    platform: Arc<dyn Platform>,
}

impl NpmProvider {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    fn npm(&self) -> Result<PathBuf> {
        find_tool(self.platform.as_ref(), &["npm"])
            .ok_or_else(|| InstallError::unavailable(self.name(), "npm not found in PATH"))
    }

    fn run(&self, ctx: &ExecContext, args: &[&str]) -> Result<process::CommandOutput> {
        process::run_program(ctx, &self.npm()?, args)?.checked()
    }

    /// Version of a globally installed package according to npm.
    pub fn installed_version(&self, ctx: &ExecContext, package: &str) -> Result<Version> {
        let out = self.run(ctx, &["list", "-g", package, "--depth=0", "--json"])?;
        parse_list_json(&out.stdout, package)
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
                debug!(package, error = %e, "npm list failed, falling back to detection");
                detect_version(ctx, self.platform.as_ref(), agent)
            }
        }
    }
}

impl Provider for NpmProvider {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn method(&self) -> InstallMethod {
        InstallMethod::Npm
    }

    fn is_available(&self) -> bool {
        self.platform.is_executable_in_path("npm")
    }

    fn install(
        &self,
        ctx: &ExecContext,
        agent: &AgentDef,
        method: &InstallMethodDef,
        force: bool,
    ) -> Result<InstallResult> {
        let package = package_or_else(method, parse_package_name)?;
        let started = Instant::now();
        info!(agent = %agent.id, package, "npm install");

        let mut args = vec!["install", "-g", package.as_str()];
        if force {
            args.push("--force");
        }
        let out = self.run(ctx, &args)?;

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
        let package = package_or_else(method, parse_package_name)?;
        let started = Instant::now();
        info!(agent = %agent.id, package, "npm update");

        let spec = format!("{}@latest", package);
        let out = self.run(ctx, &["install", "-g", spec.as_str()])?;

        let version = self.installed_or_detected(ctx, agent, &package)?;
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
        let package = package_or_else(method, parse_package_name)?;
        info!(agent = %installation.agent_id, package, "npm uninstall");
        self.run(ctx, &["uninstall", "-g", package.as_str()])?;
        Ok(())
    }

    fn latest_version(&self, ctx: &ExecContext, method: &InstallMethodDef) -> Result<Version> {
        let package = package_or_else(method, parse_package_name)?;
        let out = self.run(ctx, &["view", package.as_str(), "version"])?;
        let text = out.stdout.trim();
        if text.is_empty() {
            return Err(InstallError::PackageNotFound(package));
        }
        Version::parse(text)
    }
}

/// Package named after `-g`/`--global` in an npm command line, without any
/// `@version` suffix.
pub fn parse_package_name(command: &str) -> Option<String> {
    let tokens: Vec<&str> = command.split_whitespace().collect();
    let token = token_after(&tokens, &["-g", "--global"], &[])
        .or_else(|| token_after(&tokens, &["install", "i", "add"], &[]))?;
    Some(strip_version_suffix(token).to_string())
}

/// `@scope/pkg@1.2.3` -> `@scope/pkg`, `pkg@latest` -> `pkg`.
fn strip_version_suffix(spec: &str) -> &str {
    let search_from = usize::from(spec.starts_with('@'));
    match spec[search_from..].find('@') {
        Some(idx) => &spec[..search_from + idx],
        None => spec,
    }
}

/// Read `dependencies.<package>.version` from `npm list --json` output.
fn parse_list_json(json: &str, package: &str) -> Option<Version> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    let version = value
        .get("dependencies")?
        .get(package)?
        .get("version")?
        .as_str()?;
    Version::parse(version).ok()
}
