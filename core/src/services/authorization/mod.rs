//! Authorization gate: role allow-list plus geographic scope injection.

mod gate;
mod policy;

pub use gate::AuthorizationGate;
pub use policy::AccessPolicy;
