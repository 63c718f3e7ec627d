//! In-memory agent persona registry

use std::sync::RwLock;
use tracing::info;

use pagent_core::{AgentPersona, Error, Result};

/// Process-lifetime registry of personas, starting with the default one
pub struct AgentRegistry {
    agents: RwLock<Vec<AgentPersona>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(vec![AgentPersona::default_assistant()]),
        }
    }

    /// Register a new persona; an existing id is rejected and left untouched
    pub fn register(
        &self,
        agent_id: &str,
        name: &str,
        system_prompt: &str,
        model_override: Option<String>,
    ) -> Result<AgentPersona> {
        if agent_id.trim().is_empty() {
            return Err(Error::InvalidInput("agent_id must not be empty".to_string()));
        }

        // Check and insert under one write lock.
        let mut agents = self.agents.write()
            .map_err(|e| Error::Other(format!("Lock error: {}", e)))?;
        if agents.iter().any(|a| a.agent_id == agent_id) {
            return Err(Error::AgentExists(agent_id.to_string()));
        }

        let persona = AgentPersona::new(agent_id, name, system_prompt, model_override);
        agents.push(persona.clone());
        info!(agent_id, "Registered agent");
        Ok(persona)
    }

    pub fn get(&self, agent_id: &str) -> Result<AgentPersona> {
        let agents = self.agents.read()
            .map_err(|e| Error::Other(format!("Lock error: {}", e)))?;
        agents
            .iter()
            .find(|a| a.agent_id == agent_id)
            .cloned()
            .ok_or_else(|| Error::AgentNotFound(agent_id.to_string()))
    }

    /// All personas in registration order
    pub fn list(&self) -> Result<Vec<AgentPersona>> {
        let agents = self.agents.read()
            .map_err(|e| Error::Other(format!("Lock error: {}", e)))?;
        Ok(agents.clone())
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
