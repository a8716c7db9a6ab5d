use super::helpers::{report_failure, with_spinner, Session};
use crate::error::Result;

pub fn execute(session: &Session, agent_id: &str, method: Option<&str>) -> Result<()> {
    let agent = session.agent(agent_id)?;
    let def = session.method_for(agent, method)?;
    let installation = session.installed(agent, &def)?;
    let ctx = session.config.exec_context();

    let msg = format!("Uninstalling {} via {}", agent.name, def.method);
    with_spinner(&msg, || session.manager.uninstall(&ctx, &installation, &def))
        .inspect_err(|e| report_failure(&def.method, "uninstall", e))?;

    println!("Uninstalled {}", agent.name);
    Ok(())
}
