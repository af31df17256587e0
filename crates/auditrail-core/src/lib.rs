//! # Auditrail Core
//!
//! Audit scopes that record what an operation did.
//!
//! An [`Auditor`] holds the shared configuration: where events go (the
//! [`AuditSink`]), when they are persisted (the [`CreationPolicy`]), the
//! lifecycle hooks and the clock. Each audited operation opens an
//! [`AuditScope`], which builds an [`AuditEvent`], tracks an optional
//! before/after snapshot of the object being changed, and drives the event
//! through the save points its policy prescribes.
//!
//! # Example
//!
//! ```
//! use auditrail_core::{Auditor, MemorySink};
//!
//! # fn main() -> auditrail_core::Result<()> {
//! let auditor = Auditor::builder().sink(MemorySink::new()).build();
//!
//! let mut scope = auditor.scope("order:update").begin()?;
//! scope.set_custom_field("order_id", 1234);
//! scope.comment("status checked");
//! scope.complete()?;
//! # Ok(())
//! # }
//! ```

mod auditor;
mod clock;
mod error;
mod event;
mod hooks;
mod policy;
mod scope;
pub mod sink;

// Public API
pub use auditor::{Auditor, AuditorBuilder};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AuditError, Result};
pub use event::{AuditEvent, EventTarget};
pub use hooks::{HookMoment, ScopeHook};
pub use policy::{CreationPolicy, SaveMode, SavePhase, SinkAction};
pub use scope::{AuditScope, ScopeBuilder, ScopeStatus};
pub use sink::{AuditSink, DynamicSink, EventId, FileSink, MemorySink};
