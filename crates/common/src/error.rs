use thiserror::Error;

/// The error taxonomy shared by the whole server: every handler failure is
/// one of these kinds, and every kind maps to exactly one outbound `error`
/// frame shape (see `parlor_protocol::outbound::error_frame`).
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid JSON format")]
    InvalidFrame,

    #[error("Invalid message type: {0}")]
    InvalidType(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    CredentialConflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("target not in room")]
    TargetAbsent,

    #[error("Server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// A stable code for logging/tests; not part of the wire format.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFrame => "invalid_frame",
            Self::InvalidType(_) => "invalid_type",
            Self::Validation(_) => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::CredentialConflict(_) => "credential_conflict",
            Self::InvalidCredentials => "invalid_credentials",
            Self::TargetAbsent => "target_absent",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
