use thiserror::Error;

/// Errors surfaced by descriptor lookups.
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("No entity descriptor is registered for type: {0}")]
    MissingDescriptor(&'static str),
}

pub type Result<T> = std::result::Result<T, EntityError>;
