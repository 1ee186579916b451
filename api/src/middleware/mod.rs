//! Middleware stages, outermost first: security headers, CORS, request
//! logging, admission, rate-limit headers, authentication, authorization.

pub mod access;
pub mod admission;
pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod security;

pub use access::{Access, AccessRequirement, RequireAccess};
pub use admission::AdmissionGate;
pub use auth::{AuthContext, AuthMethod, Authenticate};
pub use cors::create_cors;
pub use rate_limit::{RateLimitHeaders, RateLimitSnapshot};
pub use security::SecurityHeaders;
