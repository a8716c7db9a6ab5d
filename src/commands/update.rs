use super::helpers::{report_failure, with_spinner, Session};
use crate::agents::{AgentDef, InstallResult};
use crate::error::{InstallError, Result};
use tracing::debug;

/// Outcome counts of an update run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl Tally {
    fn record(&mut self, result: &Result<InstallResult>) {
        match result {
            Ok(r) if r.was_updated => self.updated += 1,
            Ok(_) => self.unchanged += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Update a single agent.
pub fn execute(session: &Session, agent_id: &str, method: Option<&str>) -> Result<Tally> {
    let mut tally = Tally::default();
    let agent = session.agent(agent_id)?;
    let result = update_one(session, agent, method);
    tally.record(&result);
    result?;
    Ok(tally)
}

/// Update every installed agent in catalog order, one after another.
///
/// Agents that are not installed or have no matching method are skipped and
/// not counted.
pub fn execute_all(session: &Session, method: Option<&str>) -> Tally {
    let mut tally = Tally::default();
    for agent in session.catalog.agents() {
        match update_one(session, agent, method) {
            Err(InstallError::NotInstalled(_)) => debug!(agent = %agent.id, "not installed, skipping"),
            Err(InstallError::NoAvailableMethod(_) | InstallError::UnsupportedMethod(_)) => {
                debug!(agent = %agent.id, "no matching method, skipping")
            }
            result => tally.record(&result),
        }
    }
    println!();
    println!(
        "{} updated, {} already current, {} failed",
        tally.updated, tally.unchanged, tally.failed
    );
    tally
}

/// Update one agent under its own fresh timeout. No retries.
fn update_one(session: &Session, agent: &AgentDef, method: Option<&str>) -> Result<InstallResult> {
    let def = session.method_for(agent, method)?;
    let installation = session.installed(agent, &def)?;
    let ctx = session.config.exec_context();

    let msg = format!("Updating {} via {}", agent.name, def.method);
    let result = with_spinner(&msg, || {
        session.manager.update(&ctx, &installation, agent, &def)
    });

    match &result {
        Ok(r) if r.was_updated => println!(
            "Updated {} {} -> {}",
            agent.name, installation.installed_version, r.version
        ),
        Ok(r) => println!("{} is up to date ({})", agent.name, r.version),
        Err(e) => {
            eprintln!("Failed to update {}: {}", agent.name, e);
            report_failure(&def.method, "update", e);
        }
    }
    result
}
