//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// UserId validation error
    #[error("UserId cannot be empty")]
    UserIdEmpty,

    /// UserId too long error
    #[error("UserId cannot exceed {max} characters (got {actual})")]
    UserIdTooLong { max: usize, actual: usize },

    /// UserName validation error
    #[error("UserName cannot be empty")]
    UserNameEmpty,

    /// UserName too long error
    #[error("UserName cannot exceed {max} characters (got {actual})")]
    UserNameTooLong { max: usize, actual: usize },

    /// Email validation error
    #[error("Email cannot be empty")]
    EmailEmpty,

    /// Email too long error
    #[error("Email cannot exceed {max} characters (got {actual})")]
    EmailTooLong { max: usize, actual: usize },

    /// Email invalid format error
    #[error("Email must contain '@' (got: {0})")]
    EmailInvalidFormat(String),

    /// FileId validation error
    #[error("FileId cannot be empty")]
    FileIdEmpty,

    /// FileId too long error
    #[error("FileId cannot exceed {max} characters (got {actual})")]
    FileIdTooLong { max: usize, actual: usize },

    /// ConnectionId validation error
    #[error("ConnectionId cannot be empty")]
    ConnectionIdEmpty,
}

/// Errors returned by the repository layer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A connection with the same id is already registered
    #[error("Connection '{0}' is already registered")]
    DuplicateConnection(String),

    /// Connection info not found in the registry
    #[error("Connection '{0}' not found in the registry")]
    ConnectionNotFound(String),
}
