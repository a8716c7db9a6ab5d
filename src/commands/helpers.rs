use crate::agents::{AgentCatalog, AgentDef, InstallMethodDef, Installation};
use crate::config::Config;
use crate::error::{InstallError, Result};
use crate::hints;
use crate::manager::Manager;
use crate::utils::progress;
use std::sync::Arc;

/// Everything a command needs: effective config, catalog and manager.
pub struct Session {
    pub config: Config,
    pub catalog: AgentCatalog,
    pub manager: Manager,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        let catalog = config.catalog()?;
        let manager = Manager::new(Arc::new(config.platform()));
        Ok(Self {
            config,
            catalog,
            manager,
        })
    }

    pub fn agent(&self, id: &str) -> Result<&AgentDef> {
        self.catalog
            .get(id)
            .ok_or_else(|| InstallError::AgentNotFound(id.to_string()))
    }

    /// The method named `requested`, or the first usable method of `agent`.
    ///
    /// `requested` matches a method key first, then a method kind.
    pub fn method_for(&self, agent: &AgentDef, requested: Option<&str>) -> Result<InstallMethodDef> {
        let Some(name) = requested else {
            return self
                .manager
                .available_methods(agent)
                .into_iter()
                .next()
                .ok_or_else(|| InstallError::NoAvailableMethod(agent.id.clone()));
        };

        let def = agent
            .method(name)
            .or_else(|| agent.install_methods.values().find(|d| d.method == name))
            .ok_or_else(|| InstallError::UnsupportedMethod(format!("{} for {}", name, agent.id)))?;

        let platform_id = self.manager.platform().id();
        if !def.supports_platform(platform_id) {
            return Err(InstallError::NoAvailableMethod(format!(
                "{} via {} on {}",
                agent.id, name, platform_id
            )));
        }
        Ok(def.clone())
    }

    /// Installed copy of `agent`, detected under a fresh timeout.
    pub fn installed(&self, agent: &AgentDef, method: &InstallMethodDef) -> Result<Installation> {
        let ctx = self.config.exec_context();
        self.manager
            .detect(&ctx, agent, &method.method)?
            .ok_or_else(|| InstallError::NotInstalled(agent.name.clone()))
    }
}

/// Run `f` behind a spinner, finishing it according to the outcome.
pub fn with_spinner<T>(msg: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let pb = progress::spinner(msg);
    let result = f();
    match &result {
        Ok(_) => progress::finish_ok(&pb, msg),
        Err(_) => progress::finish_err(&pb, msg),
    }
    result
}

/// Print the hint for a failed operation, if there is one.
pub fn report_failure(method: &str, operation: &str, err: &InstallError) {
    let hint = hints::hint_for_error(method, operation, err);
    if !hint.is_empty() {
        eprintln!();
        eprintln!("Hint: {}", hint);
    }
}
