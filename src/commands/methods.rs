use super::helpers::Session;
use crate::error::Result;

pub fn execute(session: &Session, agent_id: &str) -> Result<()> {
    let agent = session.agent(agent_id)?;
    let platform_id = session.manager.platform().id();
    let usable = session.manager.available_methods(agent);

    println!("{} ({}) on {}:", agent.name, agent.id, platform_id);
    for (name, def) in &agent.install_methods {
        let status = if usable.iter().any(|u| u.method == def.method && u.command == def.command) {
            "available"
        } else if !def.supports_platform(platform_id) {
            "other platform"
        } else {
            "tool missing"
        };
        let target = if def.package.is_empty() {
            def.command.as_str()
        } else {
            def.package.as_str()
        };
        println!("  {:<12} {:<10} {:<16} {}", name, def.method, status, target);
    }

    Ok(())
}
