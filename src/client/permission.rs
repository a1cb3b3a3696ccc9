//! Per-scope permissions
//!
//! Permissions are granted on a topic scope (the first topic segment).
//! Read allows subscribing under the scope; Write allows publishing.
//! The maps are produced by the admission workflow outside the hub; the
//! defaults below are the sets it assigns to freshly provisioned clients.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

pub const INIT_SCOPE: &str = "init";
pub const DATA_SCOPE: &str = "data";
pub const ALERT_SCOPE: &str = "alert";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions {
    grants: HashMap<String, HashSet<Permission>>,
}

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Permissions::insert`].
    pub fn grant(mut self, scope: impl Into<String>, kind: Permission) -> Self {
        self.insert(scope, kind);
        self
    }

    pub fn insert(&mut self, scope: impl Into<String>, kind: Permission) {
        self.grants.entry(scope.into()).or_default().insert(kind);
    }

    pub fn revoke(&mut self, scope: &str, kind: Permission) {
        if let Some(kinds) = self.grants.get_mut(scope) {
            kinds.remove(&kind);
            if kinds.is_empty() {
                self.grants.remove(scope);
            }
        }
    }

    pub fn allows(&self, scope: &str, kind: Permission) -> bool {
        self.grants
            .get(scope)
            .is_some_and(|kinds| kinds.contains(&kind))
    }

    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }

    /// Write-only on the initialization scope. Assigned to plugins and
    /// sensors that have not been approved yet.
    pub fn init_only() -> Self {
        Self::new().grant(INIT_SCOPE, Permission::Write)
    }

    /// Write on the init, data and alert scopes. Assigned to approved sensors.
    pub fn sensor_full() -> Self {
        Self::new()
            .grant(INIT_SCOPE, Permission::Write)
            .grant(DATA_SCOPE, Permission::Write)
            .grant(ALERT_SCOPE, Permission::Write)
    }
}
