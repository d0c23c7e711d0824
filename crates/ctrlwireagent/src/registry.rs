//! Callback registry
//!
//! Maps engine-assigned hook ids to callbacks and holds the permission
//! callback. The registry is filled once during session setup and shared
//! read-only with the message router afterwards.

use crate::hooks::{HookCallback, HookMatcher};
use crate::permissions::PermissionCallback;
use ctrlwire_protocol::HookEvent;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};

/// Registry of hook and permission callbacks
#[derive(Default)]
pub struct CallbackRegistry {
    hooks: HashMap<String, HookCallback>,
    permission: Option<PermissionCallback>,
    next_hook_id: u64,
}

impl CallbackRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook callback under the next `hook_{n}` id
    pub fn register_hook(&mut self, callback: HookCallback) -> String {
        let id = format!("hook_{}", self.next_hook_id);
        self.next_hook_id += 1;
        self.hooks.insert(id.clone(), callback);
        id
    }

    /// Register a hook callback under a caller-chosen id
    ///
    /// Replaces any callback already registered under `id`.
    pub fn insert_hook(&mut self, id: impl Into<String>, callback: HookCallback) {
        self.hooks.insert(id.into(), callback);
    }

    /// Look up a hook callback
    pub fn hook(&self, id: &str) -> Option<HookCallback> {
        self.hooks.get(id).cloned()
    }

    /// Set the permission callback
    pub fn set_permission_callback(&mut self, callback: PermissionCallback) {
        self.permission = Some(callback);
    }

    /// Get the permission callback
    pub fn permission_callback(&self) -> Option<PermissionCallback> {
        self.permission.clone()
    }

    /// Check if any hook or permission callback is registered
    pub fn has_callbacks(&self) -> bool {
        !self.hooks.is_empty() || self.permission.is_some()
    }

    /// Number of registered hooks
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Register every matcher's callbacks and build the `hooks` field of the
    /// initialize request
    ///
    /// Output shape: `{Event: [{matcher, hookCallbackIds, timeout?}]}`.
    /// Events with no matchers are left out.
    pub fn register_matchers(
        &mut self,
        hooks: &BTreeMap<HookEvent, Vec<HookMatcher>>,
    ) -> Map<String, Value> {
        let mut config = Map::new();

        for (event, matchers) in hooks {
            if matchers.is_empty() {
                continue;
            }

            let entries: Vec<Value> = matchers
                .iter()
                .map(|matcher| {
                    let ids: Vec<String> = matcher
                        .hooks
                        .iter()
                        .map(|hook| self.register_hook(hook.clone()))
                        .collect();

                    let mut entry = json!({
                        "matcher": matcher.matcher,
                        "hookCallbackIds": ids,
                    });
                    if let Some(timeout) = matcher.timeout {
                        entry["timeout"] = json!(timeout);
                    }
                    entry
                })
                .collect();

            config.insert(event.as_str().to_string(), Value::Array(entries));
        }

        config
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&String> = self.hooks.keys().collect();
        ids.sort();
        f.debug_struct("CallbackRegistry")
            .field("hooks", &ids)
            .field("permission", &self.permission.is_some())
            .finish()
    }
}
