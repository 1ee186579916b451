//! Operation allow-list configuration

use serde::{Deserialize, Serialize};

/// One allow-list entry
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccessRule {
    /// Operation name, e.g. `members.list`
    pub operation: String,

    /// Role codes permitted to perform it
    pub roles: Vec<String>,
}

/// Maps an operation name to the role codes permitted to perform it.
///
/// Superusers and national-level administrators are not listed here;
/// they pass every operation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessPolicyConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<AccessRule>,
}

impl Default for AccessPolicyConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl AccessPolicyConfig {
    pub fn roles_for(&self, operation: &str) -> Option<&[String]> {
        self.rules
            .iter()
            .find(|rule| rule.operation == operation)
            .map(|rule| rule.roles.as_slice())
    }
}

fn rule(operation: &str, roles: &[&str]) -> AccessRule {
    AccessRule {
        operation: operation.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

fn default_rules() -> Vec<AccessRule> {
    const ADMINS: [&str; 4] = [
        "province_admin",
        "district_admin",
        "municipal_admin",
        "ward_admin",
    ];
    const READERS: [&str; 5] = [
        "province_admin",
        "district_admin",
        "municipal_admin",
        "ward_admin",
        "viewer",
    ];

    vec![
        rule("members.list", &READERS),
        rule("members.read", &READERS),
        rule("members.write", &ADMINS),
        rule("wards.list", &READERS),
        rule("documents.list", &READERS),
        rule("documents.upload", &ADMINS),
        rule("audit.read", &["province_admin"]),
    ]
}
