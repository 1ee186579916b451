//! MFA policy table keyed by admin level and role code

use wg_shared::MfaPolicyConfig;

use crate::domain::entities::{AdminLevel, RoleCode};
use crate::errors::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaPolicyRule {
    pub admin_level: Option<AdminLevel>,
    pub role_code: Option<RoleCode>,
    pub required: bool,
}

impl MfaPolicyRule {
    fn matches(&self, level: AdminLevel, role: &RoleCode) -> bool {
        self.admin_level.map_or(true, |l| l == level)
            && self.role_code.as_ref().map_or(true, |r| r == role)
    }

    fn specificity(&self) -> u8 {
        u8::from(self.admin_level.is_some()) + u8::from(self.role_code.is_some())
    }
}

/// The most specific matching rule wins; earlier rules win ties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaPolicy {
    rules: Vec<MfaPolicyRule>,
    default_required: bool,
}

impl Default for MfaPolicy {
    fn default() -> Self {
        // Built-in table always parses
        Self::try_from(&MfaPolicyConfig::default()).unwrap_or(Self {
            rules: Vec::new(),
            default_required: true,
        })
    }
}

impl MfaPolicy {
    pub fn new(rules: Vec<MfaPolicyRule>, default_required: bool) -> Self {
        Self {
            rules,
            default_required,
        }
    }

    pub fn requires_mfa(&self, level: AdminLevel, role: &RoleCode) -> bool {
        let mut best: Option<&MfaPolicyRule> = None;
        for rule in self.rules.iter().filter(|r| r.matches(level, role)) {
            if best.map_or(true, |b| rule.specificity() > b.specificity()) {
                best = Some(rule);
            }
        }
        best.map_or(self.default_required, |rule| rule.required)
    }
}

impl TryFrom<&MfaPolicyConfig> for MfaPolicy {
    type Error = DomainError;

    fn try_from(config: &MfaPolicyConfig) -> Result<Self, Self::Error> {
        let rules = config
            .rules
            .iter()
            .map(|rule| {
                let admin_level = rule
                    .admin_level
                    .as_deref()
                    .map(str::parse::<AdminLevel>)
                    .transpose()
                    .map_err(|message| DomainError::Validation { message })?;
                Ok(MfaPolicyRule {
                    admin_level,
                    role_code: rule.role_code.as_deref().map(RoleCode::new),
                    required: rule.required,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(Self::new(rules, config.default_required))
    }
}
