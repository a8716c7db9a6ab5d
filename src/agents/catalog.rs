//! Local agent catalog loaded from TOML.

use super::definition::AgentDef;
use super::method::InstallMethod;
use crate::error::{InstallError, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    agents: Vec<AgentDef>,
}

/// Agent definitions keyed by ID, in file order.
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    agents: IndexMap<String, AgentDef>,
}

impl AgentCatalog {
    /// The catalog shipped with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(include_str!("../../agents/catalog.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(contents)?;
        let mut agents = IndexMap::new();
        for agent in file.agents {
            validate_agent(&agent)?;
            if agents.contains_key(&agent.id) {
                return Err(InstallError::InvalidConfig(format!(
                    "Duplicate agent id '{}'",
                    agent.id
                )));
            }
            agents.insert(agent.id.clone(), agent);
        }
        Ok(Self { agents })
    }

    pub fn get(&self, id: &str) -> Option<&AgentDef> {
        self.agents.get(id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentDef> {
        self.agents.values()
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }
}

/// Validate that an agent definition is complete and usable
fn validate_agent(agent: &AgentDef) -> Result<()> {
    if agent.id.is_empty() {
        return Err(InstallError::InvalidConfig(
            "Agent id cannot be empty".to_string(),
        ));
    }
    if agent.install_methods.is_empty() {
        return Err(InstallError::InvalidConfig(format!(
            "Agent '{}' has no install methods",
            agent.id
        )));
    }
    for (name, def) in &agent.install_methods {
        if def.method.parse::<InstallMethod>().is_err() {
            return Err(InstallError::InvalidConfig(format!(
                "Agent '{}' method '{}' uses unknown install method '{}'",
                agent.id, name, def.method
            )));
        }
    }
    Ok(())
}
