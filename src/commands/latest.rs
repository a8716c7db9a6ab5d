use super::helpers::Session;
use crate::error::{InstallError, Result};

pub fn execute(session: &Session, agent_id: &str, method: Option<&str>) -> Result<()> {
    let agent = session.agent(agent_id)?;
    let def = session.method_for(agent, method)?;
    let ctx = session.config.exec_context();

    let latest = session.manager.latest_version(&ctx, &def)?;
    println!("{} {} (via {})", agent.name, latest, def.method);

    let installed = match session.installed(agent, &def) {
        Ok(inst) => inst.with_latest(latest),
        Err(InstallError::NotInstalled(_)) => return Ok(()),
        Err(e) => return Err(e),
    };
    if installed.has_update() {
        println!(
            "  installed {}, run `agent-manager update {}` to upgrade",
            installed.installed_version, agent.id
        );
    } else if !installed.installed_version.is_zero() {
        println!("  installed {} is up to date", installed.installed_version);
    }

    Ok(())
}
