use super::helpers::Session;
use crate::error::{InstallError, Result};

pub fn execute(session: &Session) -> Result<()> {
    let agents: Vec<_> = session.catalog.agents().collect();
    if agents.is_empty() {
        println!("No agents in the catalog.");
        return Ok(());
    }

    println!("{:<16} {:<20} {:>12}  {}", "AGENT", "NAME", "INSTALLED", "METHODS");
    println!("{}", "-".repeat(72));
    for agent in agents {
        // Fresh timeout per agent so one hanging version command doesn't starve the rest
        let ctx = session.config.exec_context();
        let installed = match session.manager.detect(&ctx, agent, "") {
            Ok(Some(inst)) if inst.installed_version.is_zero() => "unknown".to_string(),
            Ok(Some(inst)) => inst.installed_version.to_string(),
            Ok(None) => "-".to_string(),
            Err(e @ (InstallError::Cancelled(_) | InstallError::Timeout { .. })) => {
                tracing::warn!(agent = %agent.id, error = %e, "detection aborted");
                "?".to_string()
            }
            Err(e) => return Err(e),
        };

        let methods: Vec<String> = session
            .manager
            .available_methods(agent)
            .into_iter()
            .map(|d| d.method)
            .collect();
        let methods = if methods.is_empty() {
            "none usable here".to_string()
        } else {
            methods.join(", ")
        };

        println!(
            "{:<16} {:<20} {:>12}  {}",
            agent.id, agent.name, installed, methods
        );
    }

    Ok(())
}
