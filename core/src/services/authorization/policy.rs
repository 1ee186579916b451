//! Operation allow-list

use std::collections::{HashMap, HashSet};

use wg_shared::AccessPolicyConfig;

use crate::domain::entities::RoleCode;

/// Operation name to permitted role codes. Unknown operations permit nobody.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: HashMap<String, HashSet<RoleCode>>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `roles` to perform `operation`, in addition to any already allowed
    pub fn allow<I, R>(mut self, operation: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.rules
            .entry(operation.into())
            .or_default()
            .extend(roles.into_iter().map(RoleCode::new));
        self
    }

    pub fn allows(&self, operation: &str, role: &RoleCode) -> bool {
        self.rules
            .get(operation)
            .is_some_and(|roles| roles.contains(role))
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

impl From<&AccessPolicyConfig> for AccessPolicy {
    fn from(config: &AccessPolicyConfig) -> Self {
        config
            .rules
            .iter()
            .fold(AccessPolicy::new(), |policy, rule| {
                policy.allow(rule.operation.clone(), rule.roles.iter().cloned())
            })
    }
}
