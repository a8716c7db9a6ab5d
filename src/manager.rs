//! Routes install operations to the provider that owns each method.

use crate::agents::{AgentDef, InstallMethod, InstallMethodDef, InstallResult, Installation, MethodFamily};
use crate::error::{InstallError, Result};
use crate::platform::{HostPlatform, Platform};
use crate::providers::{
    detect_version, locate_executable, BrewProvider, NativeProvider, NpmProvider, PipProvider,
    Provider, WingetProvider,
};
use crate::utils::process::ExecContext;
use crate::version::Version;
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point for installing, updating and uninstalling agents.
///
/// Holds one provider per family and no other state, so a single `Manager`
/// can serve concurrent calls as long as each brings its own [`ExecContext`].
pub struct Manager {
    platform: Arc<dyn Platform>,
    npm: NpmProvider,
    pip: PipProvider,
    brew: BrewProvider,
    winget: WingetProvider,
    native: NativeProvider,
}

impl Manager {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            npm: NpmProvider::new(platform.clone()),
            pip: PipProvider::new(platform.clone()),
            brew: BrewProvider::new(platform.clone()),
            winget: WingetProvider::new(platform.clone()),
            native: NativeProvider::new(platform.clone()),
            platform,
        }
    }

    /// Manager for the machine the process runs on.
    pub fn host() -> Self {
        Self::new(Arc::new(HostPlatform::new()))
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    fn provider(&self, method: InstallMethod) -> &dyn Provider {
        match method.family() {
            MethodFamily::Npm => &self.npm,
            MethodFamily::Pip => &self.pip,
            MethodFamily::Brew => &self.brew,
            MethodFamily::Winget => &self.winget,
            MethodFamily::Native => &self.native,
        }
    }

    fn is_usable(&self, method: InstallMethod) -> bool {
        match method.family() {
            MethodFamily::Pip => self.pip.is_method_available(method),
            _ => self.provider(method).is_available(),
        }
    }

    /// Owning provider for `method`, checked for availability.
    fn resolve(&self, method: &str) -> Result<&dyn Provider> {
        let parsed: InstallMethod = method.parse()?;
        let provider = self.provider(parsed);
        if !self.is_usable(parsed) {
            return Err(InstallError::unavailable(
                provider.name(),
                format!("{} is not usable on {}", parsed, self.platform.id()),
            ));
        }
        debug!(method, provider = provider.name(), "dispatching");
        Ok(provider)
    }

    pub fn install(
        &self,
        ctx: &ExecContext,
        agent: &AgentDef,
        method: &InstallMethodDef,
        force: bool,
    ) -> Result<InstallResult> {
        let provider = self.resolve(&method.method)?;
        let result = provider.install(ctx, agent, method, force)?;
        info!(agent = %agent.id, method = %method.method, version = %result.version, "installed");
        Ok(result)
    }

    pub fn update(
        &self,
        ctx: &ExecContext,
        installation: &Installation,
        agent: &AgentDef,
        method: &InstallMethodDef,
    ) -> Result<InstallResult> {
        let provider = self.resolve(&method.method)?;
        let result = provider.update(ctx, installation, agent, method)?;
        info!(
            agent = %agent.id,
            from = %installation.installed_version,
            to = %result.version,
            updated = result.was_updated,
            "update finished"
        );
        Ok(result)
    }

    pub fn uninstall(
        &self,
        ctx: &ExecContext,
        installation: &Installation,
        method: &InstallMethodDef,
    ) -> Result<()> {
        let provider = self.resolve(&method.method)?;
        provider.uninstall(ctx, installation, method)?;
        info!(agent = %installation.agent_id, method = %method.method, "uninstalled");
        Ok(())
    }

    /// Methods of `agent` that can be used here, in catalog order.
    pub fn available_methods(&self, agent: &AgentDef) -> Vec<InstallMethodDef> {
        let platform_id = self.platform.id();
        agent
            .install_methods
            .values()
            .filter(|def| def.supports_platform(platform_id))
            .filter(|def| {
                def.method
                    .parse::<InstallMethod>()
                    .is_ok_and(|m| self.is_usable(m))
            })
            .cloned()
            .collect()
    }

    /// Whether `method` can be used here.
    ///
    /// Methods without a dedicated provider are always usable; unknown names
    /// never are. Unlike the other registry-less methods, `winget` is not
    /// always true here: it asks the Windows-gated [`WingetProvider`].
    pub fn is_method_available(&self, method: &str) -> bool {
        match method.parse::<InstallMethod>() {
            Ok(m) if m.family() == MethodFamily::Native => true,
            Ok(m) => self.is_usable(m),
            Err(_) => false,
        }
    }

    /// Latest version in the registry behind `method`.
    pub fn latest_version(&self, ctx: &ExecContext, method: &InstallMethodDef) -> Result<Version> {
        let parsed: InstallMethod = method.method.parse()?;
        if parsed.family() == MethodFamily::Native {
            return Err(InstallError::NotSupported(format!(
                "{} has no registry to query for the latest version",
                parsed
            )));
        }
        self.resolve(&method.method)?.latest_version(ctx, method)
    }

    /// Snapshot of an installed copy of `agent`, if one is on PATH.
    ///
    /// `method` is recorded as-is; the engine cannot tell which method
    /// produced an executable it finds.
    pub fn detect(
        &self,
        ctx: &ExecContext,
        agent: &AgentDef,
        method: &str,
    ) -> Result<Option<Installation>> {
        let Some(executable) = locate_executable(self.platform.as_ref(), agent) else {
            debug!(agent = %agent.id, "no executable on PATH");
            return Ok(None);
        };
        let version = detect_version(ctx, self.platform.as_ref(), agent)?;
        let mut installation =
            Installation::new(&agent.id, &agent.name, method, version).with_executable(&executable);
        installation.install_path = executable.parent().map(|p| p.to_path_buf());
        installation.is_global = true;
        Ok(Some(installation))
    }
}
