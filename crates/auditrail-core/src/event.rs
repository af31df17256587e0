//! Audit event value object and its JSON form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Before/after snapshot of the object a scope is tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTarget {
    /// Caller-supplied name of the tracked type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Snapshot taken when tracking started. Fixed after capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    /// Snapshot taken at the last save point. Absent for discarded scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
}

impl EventTarget {
    /// Target with the initial snapshot captured.
    pub fn new(type_name: impl Into<String>, old: Value) -> Self {
        Self {
            type_name: type_name.into(),
            old: Some(old),
            new: None,
        }
    }
}

/// One audit event record.
///
/// Unknown keys encountered while parsing land in `custom_fields`, and
/// custom fields serialize inline at the top level, so a record round-trips
/// through JSON without losing caller extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Free-text label for the kind of operation being audited.
    pub event_type: String,
    /// Opaque caller metadata; carried through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Value>,
    /// Instant the scope opened, from the configured clock.
    pub start_time: DateTime<Utc>,
    /// Instant of the latest save point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// `end_time - start_time` in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    /// Before/after snapshot of the tracked object, when a getter was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<EventTarget>,
    /// Append-only caller commentary.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
    /// Caller-defined fields; last write wins per key.
    #[serde(flatten)]
    pub custom_fields: serde_json::Map<String, Value>,
}

impl AuditEvent {
    /// Create an event labelled with the given type, starting now.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            environment: None,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            target: None,
            comments: Vec::new(),
            custom_fields: serde_json::Map::new(),
        }
    }

    /// Add a custom field (builder form).
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields.insert(key.into(), value.into());
        self
    }

    /// Attach opaque environment metadata.
    pub fn environment(mut self, env: impl Into<Value>) -> Self {
        self.environment = Some(env.into());
        self
    }

    /// Upsert a custom field; an existing key is overwritten.
    pub fn set_custom_field(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.custom_fields.insert(key.into(), value.into());
    }

    /// Read back a custom field.
    pub fn custom_field(&self, key: &str) -> Option<&Value> {
        self.custom_fields.get(key)
    }

    /// Append a comment.
    pub fn comment(&mut self, text: impl Into<String>) {
        self.comments.push(text.into());
    }

    /// Record the end instant and derive the duration.
    pub fn set_end_time(&mut self, end: DateTime<Utc>) {
        self.duration_ms = Some((end - self.start_time).num_milliseconds());
        self.end_time = Some(end);
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Convert to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse an event back from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_creation_defaults() {
        let event = AuditEvent::new("order:update");

        assert_eq!(event.event_type, "order:update");
        assert!(event.end_time.is_none());
        assert!(event.duration_ms.is_none());
        assert!(event.target.is_none());
        assert!(event.comments.is_empty());
        assert!(event.custom_fields.is_empty());
    }

    #[test]
    fn test_custom_field_upsert_keeps_latest() {
        let mut event = AuditEvent::new("test");
        event.set_custom_field("status", "pending");
        event.set_custom_field("attempt", 1);
        event.set_custom_field("status", "done");

        assert_eq!(event.custom_field("status"), Some(&json!("done")));
        assert_eq!(event.custom_field("attempt"), Some(&json!(1)));
        assert_eq!(event.custom_fields.len(), 2);
    }

    #[test]
    fn test_comments_append_in_order() {
        let mut event = AuditEvent::new("test");
        event.comment("first");
        event.comment("second");

        assert_eq!(event.comments, vec!["first", "second"]);
    }

    #[test]
    fn test_end_time_derives_duration() {
        let mut event = AuditEvent::new("test");
        let end = event.start_time + chrono::Duration::milliseconds(10_000);
        event.set_end_time(end);

        assert_eq!(event.end_time, Some(end));
        assert_eq!(event.duration_ms, Some(10_000));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let event = AuditEvent::new("test");
        let json = event.to_json().unwrap();

        assert!(!json.contains("\"target\""));
        assert!(!json.contains("\"end_time\""));
        assert!(!json.contains("\"environment\""));
        assert!(!json.contains("\"comments\""));
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_custom_fields_serialize_inline() {
        let event = AuditEvent::new("test").field("order_id", 42);
        let json = event.to_json().unwrap();

        assert!(json.contains("\"order_id\":42"));
        assert!(!json.contains("custom_fields"));
    }

    #[test]
    fn test_roundtrip_preserves_populated_fields() {
        let mut event = AuditEvent::new("order:update")
            .field("order_id", 42)
            .environment(json!({"host": "worker-3"}));
        event.comment("reviewed");
        event.target = Some(EventTarget::new("Order", json!({"status": "created"})));
        event.set_end_time(event.start_time + chrono::Duration::milliseconds(15));

        let parsed = AuditEvent::from_json(&event.to_json().unwrap()).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_unknown_keys_land_in_custom_fields() {
        let json = r#"{
            "event_type": "import",
            "start_time": "2024-03-01T10:00:00Z",
            "batch": "b-77",
            "rows": 120
        }"#;

        let event = AuditEvent::from_json(json).unwrap();
        assert_eq!(event.event_type, "import");
        assert_eq!(event.custom_field("batch"), Some(&json!("b-77")));
        assert_eq!(event.custom_field("rows"), Some(&json!(120)));
        assert_eq!(event.custom_fields.len(), 2);
    }

    #[test]
    fn test_target_null_snapshot_is_kept_explicit() {
        let target = EventTarget::new("Order", Value::Null);
        assert_eq!(target.old, Some(Value::Null));

        let mut event = AuditEvent::new("test");
        event.target = Some(target);
        let json = event.to_json().unwrap();
        assert!(json.contains("\"old\":null"));
        assert!(!json.contains("\"new\""));
    }
}
