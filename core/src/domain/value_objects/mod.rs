//! Value objects representing immutable domain concepts.

pub mod geographic_scope;
pub mod login_outcome;


pub use geographic_scope::{AccessGrant, GeographicScope, QueryFilters};
pub use login_outcome::{IssuedSession, LoginOutcome, OtpVerified};
