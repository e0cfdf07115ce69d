use thiserror::Error;

/// Failures from the data repository, distinct from [`parlor_common::ServerError`]
/// so callers can map unique-constraint violations to the right wire error
/// without the repository knowing about frames.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("username already taken")]
    UsernameTaken,

    #[error("email already taken")]
    EmailTaken,

    #[error("not found")]
    NotFound,

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Other(#[from] sqlx::Error),
}

impl From<RepoError> for parlor_common::ServerError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::UsernameTaken => {
                parlor_common::ServerError::CredentialConflict("username already taken".into())
            },
            RepoError::EmailTaken => {
                parlor_common::ServerError::CredentialConflict("email already taken".into())
            },
            RepoError::NotFound => parlor_common::ServerError::Validation("not found".into()),
            RepoError::Corrupt(msg) => parlor_common::ServerError::Internal(msg),
            RepoError::Other(e) => parlor_common::ServerError::Internal(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;
