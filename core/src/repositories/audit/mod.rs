mod noop;
mod sink;

pub use noop::NoopAuditSink;
pub use sink::AuditSink;
