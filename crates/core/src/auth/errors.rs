use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("session token could not be issued: {0}")]
    Issue(#[source] jsonwebtoken::errors::Error),

    #[error("session token rejected: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("session token names an invalid subject")]
    InvalidSubject,
}
