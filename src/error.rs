use thiserror::Error;

/// Errors raised by the detection and isolation core.
///
/// Every variant is scoped to the request or command that triggered it;
/// none of them is fatal to the process.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GridError {
    /// Malformed input to ingestion or an operator action.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An identifier did not resolve to a known entity.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation is not a legal transition from the entity's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A switching command could not be carried out by the field device.
    #[error("Device operation failed: {0}")]
    DeviceOperation(String),
}

impl GridError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
