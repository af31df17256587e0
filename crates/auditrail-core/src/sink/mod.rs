//! Pluggable storage backends for audit events.

mod dynamic;
mod file;
mod memory;

pub use dynamic::DynamicSink;
pub use file::FileSink;
pub use memory::MemorySink;

use crate::error::Result;
use crate::event::AuditEvent;
use std::future::Future;
use std::pin::Pin;

/// Identifier a sink hands back from [`AuditSink::insert`], later used to
/// address a replace. Backends with no identifier notion return
/// `serde_json::Value::Null`; the same null value comes back on `replace`.
pub type EventId = serde_json::Value;

/// Storage backend contract.
///
/// A scope performs at most one sink call per save point and never overlaps
/// calls for the same scope; overlapping calls from different scopes are
/// expected, so implementations must be internally thread-safe.
///
/// The async variants default to the blocking implementation, so backends
/// without native async I/O implement `insert`/`replace` only. A sink that
/// shares a transactional resource with the operation being audited may
/// route its own writes around that resource's change capture; that bypass
/// is internal to the sink and invisible to the scope.
pub trait AuditSink: Send + Sync {
    /// Persist a new record for the event and return its identifier.
    fn insert(&self, event: &AuditEvent) -> Result<EventId>;

    /// Overwrite the record previously created under `id`.
    fn replace(&self, id: &EventId, event: &AuditEvent) -> Result<()>;

    /// Persist a new record without blocking the caller.
    fn insert_async<'a>(
        &'a self,
        event: &'a AuditEvent,
    ) -> Pin<Box<dyn Future<Output = Result<EventId>> + Send + 'a>> {
        Box::pin(async move { self.insert(event) })
    }

    /// Overwrite the record under `id` without blocking the caller.
    fn replace_async<'a>(
        &'a self,
        id: &'a EventId,
        event: &'a AuditEvent,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move { self.replace(id, event) })
    }
}
