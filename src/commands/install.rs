use super::helpers::{report_failure, with_spinner, Session};
use crate::error::Result;

pub fn execute(session: &Session, agent_id: &str, method: Option<&str>, force: bool) -> Result<()> {
    let agent = session.agent(agent_id)?;
    let def = session.method_for(agent, method)?;
    let ctx = session.config.exec_context();

    let msg = format!("Installing {} via {}", agent.name, def.method);
    let result = with_spinner(&msg, || session.manager.install(&ctx, agent, &def, force))
        .inspect_err(|e| report_failure(&def.method, "install", e))?;

    if result.version.is_zero() {
        println!("Installed {} ({:.1?})", agent.name, result.duration);
    } else {
        println!(
            "Installed {} {} ({:.1?})",
            agent.name, result.version, result.duration
        );
    }
    if let Some(path) = &result.executable_path {
        println!("  executable: {}", path.display());
    }

    Ok(())
}
