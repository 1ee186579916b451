//! Database module - MySQL implementations using SQLx
//!
//! - Connection pool management
//! - Credential store over the administrator directory
//! - Append-only audit sink

pub mod connection;
pub mod mysql;


pub use connection::{DatabasePool, PoolStatistics};
pub use mysql::{MySqlAuditSink, MySqlCredentialStore};
