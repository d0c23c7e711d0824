//! Permission decision and permission update types
//!
//! [`PermissionResult`] is what a permission callback returns for a
//! `can_use_tool` request. [`PermissionUpdate`] describes rule and mode changes
//! the peer suggests, or the callback asks to apply alongside an allow.

use crate::types::PermissionMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Permission behavior for rule-based updates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionBehavior {
    /// Allow the action
    Allow,

    /// Deny the action
    Deny,

    /// Ask for permission
    Ask,
}

/// Where a permission update is persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PermissionUpdateDestination {
    /// User settings
    UserSettings,

    /// Project settings
    ProjectSettings,

    /// Local (untracked) project settings
    LocalSettings,

    /// Current session only
    Session,
}

/// A single permission rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRuleValue {
    /// Tool the rule applies to
    pub tool_name: String,

    /// Optional rule content (e.g. a command prefix)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_content: Option<String>,
}

impl PermissionRuleValue {
    /// Create a rule for a tool
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            rule_content: None,
        }
    }

    /// Set the rule content
    pub fn with_rule_content(mut self, content: impl Into<String>) -> Self {
        self.rule_content = Some(content.into());
        self
    }
}

/// Payload shared by the rule-editing updates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RulesUpdate {
    /// Rules affected by the update
    pub rules: Vec<PermissionRuleValue>,

    /// Behavior the rules map to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<PermissionBehavior>,

    /// Optional destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PermissionUpdateDestination>,
}

/// Payload of a mode change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModeUpdate {
    /// Mode to switch to
    pub mode: PermissionMode,

    /// Optional destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PermissionUpdateDestination>,
}

/// Payload shared by the directory updates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoriesUpdate {
    /// Directories affected by the update
    pub directories: Vec<String>,

    /// Optional destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PermissionUpdateDestination>,
}

/// A permission change, tagged by `type` on the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PermissionUpdate {
    /// Add permission rules
    AddRules(RulesUpdate),

    /// Replace permission rules
    ReplaceRules(RulesUpdate),

    /// Remove permission rules
    RemoveRules(RulesUpdate),

    /// Set permission mode
    SetMode(ModeUpdate),

    /// Add allowed directories
    AddDirectories(DirectoriesUpdate),

    /// Remove allowed directories
    RemoveDirectories(DirectoriesUpdate),
}

impl PermissionUpdate {
    /// Create an add rules update
    pub fn add_rules(rules: Vec<PermissionRuleValue>, behavior: PermissionBehavior) -> Self {
        Self::AddRules(RulesUpdate {
            rules,
            behavior: Some(behavior),
            destination: None,
        })
    }

    /// Create a replace rules update
    pub fn replace_rules(rules: Vec<PermissionRuleValue>, behavior: PermissionBehavior) -> Self {
        Self::ReplaceRules(RulesUpdate {
            rules,
            behavior: Some(behavior),
            destination: None,
        })
    }

    /// Create a remove rules update
    pub fn remove_rules(rules: Vec<PermissionRuleValue>) -> Self {
        Self::RemoveRules(RulesUpdate {
            rules,
            behavior: None,
            destination: None,
        })
    }

    /// Create a set mode update
    pub fn set_mode(mode: PermissionMode) -> Self {
        Self::SetMode(ModeUpdate {
            mode,
            destination: None,
        })
    }

    /// Create an add directories update
    pub fn add_directories(directories: Vec<String>) -> Self {
        Self::AddDirectories(DirectoriesUpdate {
            directories,
            destination: None,
        })
    }

    /// Create a remove directories update
    pub fn remove_directories(directories: Vec<String>) -> Self {
        Self::RemoveDirectories(DirectoriesUpdate {
            directories,
            destination: None,
        })
    }

    /// Set the destination for this update
    pub fn with_destination(mut self, destination: PermissionUpdateDestination) -> Self {
        match &mut self {
            Self::AddRules(u) | Self::ReplaceRules(u) | Self::RemoveRules(u) => {
                u.destination = Some(destination)
            }
            Self::SetMode(u) => u.destination = Some(destination),
            Self::AddDirectories(u) | Self::RemoveDirectories(u) => {
                u.destination = Some(destination)
            }
        }
        self
    }

    /// Get the destination for this update
    pub fn destination(&self) -> Option<PermissionUpdateDestination> {
        match self {
            Self::AddRules(u) | Self::ReplaceRules(u) | Self::RemoveRules(u) => u.destination,
            Self::SetMode(u) => u.destination,
            Self::AddDirectories(u) | Self::RemoveDirectories(u) => u.destination,
        }
    }
}

/// Decision returned by a permission callback
///
/// Serializes to the `can_use_tool` response payload:
/// `{"behavior": "allow", "updatedInput"?, "updatedPermissions"?}` or
/// `{"behavior": "deny", "message", "interrupt"?}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "behavior", rename_all = "lowercase")]
pub enum PermissionResult {
    /// Let the tool run
    Allow {
        /// Replacement for the tool's original input
        #[serde(rename = "updatedInput", skip_serializing_if = "Option::is_none")]
        updated_input: Option<Value>,

        /// Permission changes to apply alongside the allow
        #[serde(rename = "updatedPermissions", skip_serializing_if = "Option::is_none")]
        updated_permissions: Option<Vec<PermissionUpdate>>,
    },

    /// Refuse the tool call
    Deny {
        /// Explanation shown to the model
        message: String,

        /// Also interrupt the current turn
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        interrupt: bool,
    },
}

impl PermissionResult {
    /// Allow with the original input
    pub fn allow() -> Self {
        Self::Allow {
            updated_input: None,
            updated_permissions: None,
        }
    }

    /// Allow with a replacement input
    pub fn allow_with_input(input: Value) -> Self {
        Self::Allow {
            updated_input: Some(input),
            updated_permissions: None,
        }
    }

    /// Deny with a message
    pub fn deny(message: impl Into<String>) -> Self {
        Self::Deny {
            message: message.into(),
            interrupt: false,
        }
    }

    /// Deny and interrupt the current turn
    pub fn deny_and_interrupt(message: impl Into<String>) -> Self {
        Self::Deny {
            message: message.into(),
            interrupt: true,
        }
    }

    /// Attach permission updates to an allow; has no effect on a deny
    pub fn with_updated_permissions(mut self, updates: Vec<PermissionUpdate>) -> Self {
        if let Self::Allow {
            updated_permissions,
            ..
        } = &mut self
        {
            *updated_permissions = Some(updates);
        }
        self
    }

    /// Check if this is an allow decision
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }
}

/// Ancillary metadata passed to a permission callback
///
/// Open record: keys of the request payload that have no typed field here are
/// kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolPermissionContext {
    /// Permission updates the peer suggests applying
    pub suggestions: Vec<PermissionUpdate>,

    /// Path that triggered the permission check, if any
    pub blocked_path: Option<String>,

    /// Remaining request fields
    pub extra: Map<String, Value>,
}
