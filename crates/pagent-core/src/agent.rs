//! Agent persona and conversation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the persona every registry starts with
pub const DEFAULT_AGENT_ID: &str = "default";

/// A named configuration of system prompt and optional model choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPersona {
    pub agent_id: String,
    pub name: String,
    pub system_prompt: String,
    pub model_override: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AgentPersona {
    /// Create a persona stamped with the current time
    pub fn new(
        agent_id: impl Into<String>,
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        model_override: Option<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            system_prompt: system_prompt.into(),
            model_override,
            created_at: Utc::now(),
        }
    }

    /// The built-in assistant persona
    pub fn default_assistant() -> Self {
        Self::new(
            DEFAULT_AGENT_ID,
            "Default Assistant",
            "You are a helpful private assistant. Use only explicitly provided documents and \
             knowledge from the private vector store to answer user queries. If the information \
             is missing, say you don't know and ask clarifying questions. When you include facts \
             from documents, annotate each answer with a \"SOURCES:\" section listing the \
             filename and chunk id used.",
            None,
        )
    }

    /// Model to use for this persona, given the service default
    pub fn model_or<'a>(&'a self, default_model: &'a str) -> &'a str {
        self.model_override.as_deref().unwrap_or(default_model)
    }
}

/// One prior message of a conversation, as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl ConversationTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_assistant() {
        let persona = AgentPersona::default_assistant();
        assert_eq!(persona.agent_id, DEFAULT_AGENT_ID);
        assert!(persona.system_prompt.contains("SOURCES:"));
        assert_eq!(persona.model_or("llama3"), "llama3");
    }

    #[test]
    fn test_model_override() {
        let persona = AgentPersona::new("coder", "Coder", "Write code.", Some("codellama".into()));
        assert_eq!(persona.model_or("llama3"), "codellama");
    }

    #[test]
    fn test_turn_defaults() {
        let turn: ConversationTurn = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
        assert_eq!(turn, ConversationTurn::user("hi"));

        let turn: ConversationTurn = serde_json::from_str(r#"{"role": "assistant"}"#).unwrap();
        assert_eq!(turn.content, "");
    }
}
