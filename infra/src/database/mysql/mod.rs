//! MySQL repository implementations

mod audit_sink_impl;
mod credential_store_impl;

pub use audit_sink_impl::MySqlAuditSink;
pub use credential_store_impl::MySqlCredentialStore;

pub(crate) use credential_store_impl::UserRow;
