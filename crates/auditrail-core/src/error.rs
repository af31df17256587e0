use thiserror::Error;

/// Errors surfaced by scope transitions and bundled sinks.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("No audit sink is configured for this scope")]
    MissingSink,

    #[error("Event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("No stored event matches identifier: {0}")]
    UnknownEventId(String),

    #[error("Lifecycle hook error: {0}")]
    Hook(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AuditError {
    /// Wrap an arbitrary error raised by a lifecycle hook.
    pub fn hook(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        AuditError::Hook(err.into())
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
