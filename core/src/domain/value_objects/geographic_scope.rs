//! Geographic scope derived from an administrator's level and assigned codes.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::entities::{AdminLevel, AuthenticatedIdentity, LocationCodes};
use crate::errors::AuthorizationError;

pub const PROVINCE_COLUMN: &str = "province_code";
pub const DISTRICT_COLUMN: &str = "district_code";
pub const MUNICIPAL_COLUMN: &str = "municipal_code";
pub const WARD_COLUMN: &str = "ward_code";

/// Equality filters for a downstream list or query operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryFilters(BTreeMap<String, String>);

impl QueryFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryFilters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Read-only projection of a scoped administrator's area.
///
/// Every code present is a mandatory equality filter; the code for the
/// administrator's own level is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeographicScope {
    pub level: AdminLevel,
    pub codes: LocationCodes,
}

impl GeographicScope {
    /// Derive the scope for a sub-national administrator.
    ///
    /// Fails closed when the code for the declared level is missing.
    pub fn for_identity(identity: &AuthenticatedIdentity) -> Result<Self, AuthorizationError> {
        let level = identity.admin_level;
        if level == AdminLevel::National {
            return Err(AuthorizationError::MissingScopeCode {
                level: level.to_string(),
            });
        }
        if identity.location.code_for(level).is_none() {
            return Err(AuthorizationError::MissingScopeCode {
                level: level.to_string(),
            });
        }

        // Only the declared level and its ancestors constrain the query
        let keep = |lvl: AdminLevel| -> Option<String> {
            if lvl.is_at_or_above(level) {
                identity.location.code_for(lvl).map(str::to_string)
            } else {
                None
            }
        };

        Ok(Self {
            level,
            codes: LocationCodes {
                province_code: keep(AdminLevel::Province),
                district_code: keep(AdminLevel::District),
                municipal_code: keep(AdminLevel::Municipality),
                ward_code: keep(AdminLevel::Ward),
            },
        })
    }

    /// Column/value pairs this scope enforces
    pub fn filters(&self) -> Vec<(&'static str, &str)> {
        [
            (PROVINCE_COLUMN, self.codes.province_code.as_deref()),
            (DISTRICT_COLUMN, self.codes.district_code.as_deref()),
            (MUNICIPAL_COLUMN, self.codes.municipal_code.as_deref()),
            (WARD_COLUMN, self.codes.ward_code.as_deref()),
        ]
        .into_iter()
        .filter_map(|(column, code)| code.map(|c| (column, c)))
        .collect()
    }

    /// Inject the scope into caller-supplied filters, overriding conflicting values
    pub fn apply(&self, filters: &mut QueryFilters) {
        for (column, code) in self.filters() {
            filters.insert(column, code);
        }
    }

    /// Whether a single record located at `record` falls inside this scope
    pub fn permits(&self, record: &LocationCodes) -> bool {
        self.filters()
            .into_iter()
            .all(|(column, code)| record_code(record, column) == Some(code))
    }
}

fn record_code<'a>(record: &'a LocationCodes, column: &str) -> Option<&'a str> {
    match column {
        PROVINCE_COLUMN => record.province_code.as_deref(),
        DISTRICT_COLUMN => record.district_code.as_deref(),
        MUNICIPAL_COLUMN => record.municipal_code.as_deref(),
        WARD_COLUMN => record.ward_code.as_deref(),
        _ => None,
    }
}

/// Outcome of a successful authorization check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "scope", rename_all = "lowercase")]
pub enum AccessGrant {
    /// Superuser or national administrator
    Unrestricted,
    Scoped(GeographicScope),
}

impl AccessGrant {
    pub fn scope(&self) -> Option<&GeographicScope> {
        match self {
            AccessGrant::Unrestricted => None,
            AccessGrant::Scoped(scope) => Some(scope),
        }
    }

    /// Filters to pass downstream; caller values survive only when unrestricted
    pub fn constrain(&self, mut filters: QueryFilters) -> QueryFilters {
        if let AccessGrant::Scoped(scope) = self {
            scope.apply(&mut filters);
        }
        filters
    }

    pub fn permits(&self, record: &LocationCodes) -> bool {
        match self {
            AccessGrant::Unrestricted => true,
            AccessGrant::Scoped(scope) => scope.permits(record),
        }
    }
}
