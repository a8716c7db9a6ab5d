//! Generic provider that runs catalog command lines through the shell.
//!
//! Backs every method without a dedicated provider: curl, binary, cargo, go,
//! scoop, chocolatey, dmg, krew, nix, git and friends.

use super::{detect_version, new_result, Provider};
use crate::agents::{AgentDef, InstallMethod, InstallMethodDef, InstallResult, Installation};
use crate::error::{InstallError, Result};
use crate::platform::Platform;
use crate::utils::process::{self, ExecContext};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub struct NativeProvider {
    platform: Arc<dyn Platform>,
}

impl NativeProvider {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }
}

impl Provider for NativeProvider {
    fn name(&self) -> &'static str {
        "native"
    }

    fn method(&self) -> InstallMethod {
        InstallMethod::Native
    }

    fn is_available(&self) -> bool {
        true
    }

    fn install(
        &self,
        ctx: &ExecContext,
        agent: &AgentDef,
        method: &InstallMethodDef,
        _force: bool,
    ) -> Result<InstallResult> {
        let command = method.command.trim();
        if command.is_empty() {
            return Err(InstallError::NoCommandSpecified(format!(
                "{} ({} install)",
                agent.id, method.method
            )));
        }

        let started = Instant::now();
        info!(agent = %agent.id, method = %method.method, "installing");
        let out = process::run_shell(ctx, self.platform.as_ref(), command)?.checked()?;

        let version = detect_version(ctx, self.platform.as_ref(), agent)?;
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
        let command = if method.update_cmd.trim().is_empty() {
            method.command.trim()
        } else {
            method.update_cmd.trim()
        };
        if command.is_empty() {
            return Err(InstallError::NoCommandSpecified(format!(
                "{} ({} update)",
                agent.id, method.method
            )));
        }

        let started = Instant::now();
        info!(agent = %agent.id, method = %method.method, from = %installation.installed_version, "updating");
        let out = process::run_shell(ctx, self.platform.as_ref(), command)?.checked()?;

        let version = detect_version(ctx, self.platform.as_ref(), agent)?;
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
        let command = method.uninstall_cmd.trim();
        if !command.is_empty() {
            info!(agent = %installation.agent_id, "uninstalling via command");
            process::run_shell(ctx, self.platform.as_ref(), command)?.checked()?;
            return Ok(());
        }

        match &installation.executable_path {
            Some(path) if !path.as_os_str().is_empty() => {
                info!(agent = %installation.agent_id, path = %path.display(), "removing executable");
                std::fs::remove_file(path)?;
                Ok(())
            }
            _ => Err(InstallError::NoCommandSpecified(format!(
                "{} ({} uninstall): no uninstall command and no executable path",
                installation.agent_id, method.method
            ))),
        }
    }
}
