//! In-memory sink implementation.

use super::{AuditSink, EventId};
use crate::error::{AuditError, Result};
use crate::event::AuditEvent;
use serde_json::Value;
use std::sync::RwLock;

/// In-memory sink (for development/testing).
///
/// Records are kept in insertion order; the identifier returned from an
/// insert is the record's position, so a later replace swaps in place.
#[derive(Default)]
pub struct MemorySink {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemorySink {
    /// Create an empty in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored events, in insertion order.
    pub fn events(&self) -> Result<Vec<AuditEvent>> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::Sink(format!("Failed to acquire lock: {}", e)))?;
        Ok(events.clone())
    }

    /// Fetch one stored event by position.
    pub fn get(&self, index: usize) -> Result<Option<AuditEvent>> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::Sink(format!("Failed to acquire lock: {}", e)))?;
        Ok(events.get(index).cloned())
    }

    /// Number of stored events.
    pub fn len(&self) -> Result<usize> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::Sink(format!("Failed to acquire lock: {}", e)))?;
        Ok(events.len())
    }

    /// Whether the sink holds no events.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop all stored events.
    pub fn clear(&self) -> Result<()> {
        let mut events = self
            .events
            .write()
            .map_err(|e| AuditError::Sink(format!("Failed to acquire lock: {}", e)))?;
        events.clear();
        Ok(())
    }
}

impl AuditSink for MemorySink {
    fn insert(&self, event: &AuditEvent) -> Result<EventId> {
        let mut events = self
            .events
            .write()
            .map_err(|e| AuditError::Sink(format!("Failed to acquire lock: {}", e)))?;
        events.push(event.clone());
        Ok(Value::from(events.len() - 1))
    }

    fn replace(&self, id: &EventId, event: &AuditEvent) -> Result<()> {
        let index = id
            .as_u64()
            .ok_or_else(|| AuditError::UnknownEventId(id.to_string()))? as usize;

        let mut events = self
            .events
            .write()
            .map_err(|e| AuditError::Sink(format!("Failed to acquire lock: {}", e)))?;
        let slot = events
            .get_mut(index)
            .ok_or_else(|| AuditError::UnknownEventId(id.to_string()))?;
        *slot = event.clone();
        Ok(())
    }
}
