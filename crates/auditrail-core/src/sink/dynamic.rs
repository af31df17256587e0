//! Callback-driven sink implementation.

use super::{AuditSink, EventId};
use crate::error::Result;
use crate::event::AuditEvent;
use serde_json::Value;
use uuid::Uuid;

type InsertFn = dyn Fn(&AuditEvent) -> EventId + Send + Sync;
type ReplaceFn = dyn Fn(&EventId, &AuditEvent) + Send + Sync;
type AnyFn = dyn Fn(&AuditEvent) + Send + Sync;

/// Sink that forwards events to user-supplied closures.
///
/// Useful for wiring audit output into an existing pipeline without
/// writing a full [`AuditSink`] implementation. Callbacks run in
/// registration order; when several id-producing insert callbacks are
/// registered, the identifier from the last one wins.
#[derive(Default)]
pub struct DynamicSink {
    inserts: Vec<Box<InsertFn>>,
    replaces: Vec<Box<ReplaceFn>>,
    any: Vec<Box<AnyFn>>,
}

impl DynamicSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on every insert. A fresh UUID is assigned as the event
    /// identifier.
    pub fn on_insert(mut self, f: impl Fn(&AuditEvent) + Send + Sync + 'static) -> Self {
        self.inserts.push(Box::new(move |event| {
            f(event);
            Value::String(Uuid::new_v4().to_string())
        }));
        self
    }

    /// Run `f` on every insert, using its return value as the event
    /// identifier.
    pub fn on_insert_with_id(
        mut self,
        f: impl Fn(&AuditEvent) -> EventId + Send + Sync + 'static,
    ) -> Self {
        self.inserts.push(Box::new(f));
        self
    }

    /// Run `f` on every replace.
    pub fn on_replace(
        mut self,
        f: impl Fn(&EventId, &AuditEvent) + Send + Sync + 'static,
    ) -> Self {
        self.replaces.push(Box::new(f));
        self
    }

    /// Run `f` on every insert and every replace, after the
    /// operation-specific callbacks.
    pub fn on_insert_and_replace(
        mut self,
        f: impl Fn(&AuditEvent) + Send + Sync + 'static,
    ) -> Self {
        self.any.push(Box::new(f));
        self
    }
}

impl AuditSink for DynamicSink {
    fn insert(&self, event: &AuditEvent) -> Result<EventId> {
        let mut id = Value::Null;
        for f in &self.inserts {
            id = f(event);
        }
        for f in &self.any {
            f(event);
        }
        Ok(id)
    }

    fn replace(&self, id: &EventId, event: &AuditEvent) -> Result<()> {
        for f in &self.replaces {
            f(id, event);
        }
        for f in &self.any {
            f(event);
        }
        Ok(())
    }
}
