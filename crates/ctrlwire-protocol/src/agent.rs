//! Agent definitions sent to the peer during initialization

use serde::{Deserialize, Serialize};

/// A specialized agent persona the peer may delegate to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentDefinition {
    /// When the agent should be used
    pub description: String,

    /// System prompt for the agent
    pub prompt: String,

    /// Tools the agent may use; all tools when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,

    /// Model alias (`sonnet`, `opus`, `haiku`, `inherit`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AgentDefinition {
    /// Create a new agent definition
    pub fn new(description: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            prompt: prompt.into(),
            tools: None,
            model: None,
        }
    }

    /// Restrict the agent to the given tools
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Set the model alias
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_definition_omits_unset_fields() {
        let agent = AgentDefinition::new("Reviews code", "You are a reviewer");
        assert_eq!(
            serde_json::to_value(&agent).unwrap(),
            json!({"description": "Reviews code", "prompt": "You are a reviewer"})
        );
    }

    #[test]
    fn test_agent_definition_builder() {
        let agent = AgentDefinition::new("d", "p")
            .with_tools(["Read", "Grep"])
            .with_model("haiku");
        let value = serde_json::to_value(&agent).unwrap();
        assert_eq!(value["tools"], json!(["Read", "Grep"]));
        assert_eq!(value["model"], "haiku");
    }
}
