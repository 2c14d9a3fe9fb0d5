//! # Error Types Module
//!
//! Error types shared by the backend services and the bot front end.
//!
//! - [`ErrorCode`] is the wire tag carried in a failed response envelope.
//! - [`ServiceError`] is what a service dispatcher or validator produces.
//! - [`RpcError`] is what a caller sees after an RPC call went wrong, either
//!   because the service answered with an error or because it never answered.
//! - [`ErrorKind`] is the coarse taxonomy the front end reacts to.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes carried by `Response.error.code`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "ERR_INVALID_INPUT")]
    InvalidInput,
    #[serde(rename = "ERR_NOT_FOUND")]
    NotFound,
    #[serde(rename = "ERR_UNAUTHORIZED")]
    Unauthorized,
    #[serde(rename = "ERR_DATABASE")]
    Database,
    #[serde(rename = "ERR_INTERNAL")]
    Internal,
    #[serde(rename = "ERR_DUPLICATE")]
    Duplicate,
    #[serde(rename = "ERR_SERVICE")]
    Service,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "ERR_INVALID_INPUT",
            ErrorCode::NotFound => "ERR_NOT_FOUND",
            ErrorCode::Unauthorized => "ERR_UNAUTHORIZED",
            ErrorCode::Database => "ERR_DATABASE",
            ErrorCode::Internal => "ERR_INTERNAL",
            ErrorCode::Duplicate => "ERR_DUPLICATE",
            ErrorCode::Service => "ERR_SERVICE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse error taxonomy used by the front end to decide what to tell the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing field, fixable by the caller
    InvalidInput,
    /// Referenced entity is absent
    NotFound,
    /// Privilege check failed
    Unauthorized,
    /// Uniqueness or referential conflict
    Conflict,
    /// Transport failure or timeout
    ServiceUnavailable,
    /// Unexpected failure, not fixable by the caller
    Internal,
}

impl From<ErrorCode> for ErrorKind {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::InvalidInput => ErrorKind::InvalidInput,
            ErrorCode::NotFound => ErrorKind::NotFound,
            ErrorCode::Unauthorized => ErrorKind::Unauthorized,
            ErrorCode::Duplicate => ErrorKind::Conflict,
            ErrorCode::Service => ErrorKind::ServiceUnavailable,
            ErrorCode::Database | ErrorCode::Internal => ErrorKind::Internal,
        }
    }
}

/// Errors raised by service dispatchers, validators and repositories
///
/// `Database` and `Internal` carry the underlying detail for logging only;
/// [`ServiceError::public_message`] never exposes it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("duplicate entry: {0}")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("service error: {0}")]
    Service(String),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        ServiceError::NotFound(resource.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::InvalidInput(_) => ErrorCode::InvalidInput,
            ServiceError::NotFound(_) => ErrorCode::NotFound,
            ServiceError::Unauthorized => ErrorCode::Unauthorized,
            ServiceError::Duplicate(_) => ErrorCode::Duplicate,
            ServiceError::Database(_) => ErrorCode::Database,
            ServiceError::Internal(_) => ErrorCode::Internal,
            ServiceError::Service(_) => ErrorCode::Service,
        }
    }

    /// Message safe to send across the service boundary
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::InvalidInput(msg) => msg.clone(),
            ServiceError::NotFound(resource) => format!("{resource} not found"),
            ServiceError::Unauthorized => "Access not allowed".to_string(),
            ServiceError::Duplicate(msg) => msg.clone(),
            ServiceError::Database(_) => "A database error occurred".to_string(),
            ServiceError::Internal(_) => "An internal error occurred".to_string(),
            ServiceError::Service(_) => "A service error occurred".to_string(),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => return ServiceError::Duplicate("Entry already exists".to_string()),
                // foreign_key_violation
                Some("23503") => {
                    return ServiceError::InvalidInput("Referenced entry does not exist".to_string())
                }
                // string_data_right_truncation, check_violation
                Some("22001") | Some("23514") => {
                    return ServiceError::InvalidInput(
                        "Value does not satisfy field constraints".to_string(),
                    )
                }
                _ => {}
            }
        }
        ServiceError::Database(err.to_string())
    }
}

/// Errors seen by the caller of an RPC
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    /// The service answered with `success = false`
    #[error("{code}: {message}")]
    Service { code: ErrorCode, message: String },
    /// The service could not be reached, timed out, or answered garbage
    #[error("service unavailable: {0}")]
    Unavailable(String),
    /// The envelope was fine but `data` did not have the expected shape
    #[error("malformed response data: {0}")]
    Malformed(String),
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Service { code, .. } => ErrorKind::from(*code),
            RpcError::Unavailable(_) => ErrorKind::ServiceUnavailable,
            RpcError::Malformed(_) => ErrorKind::Internal,
        }
    }

    /// Service-provided message for caller-fixable failures
    pub fn user_message(&self) -> Option<&str> {
        match self {
            RpcError::Service { message, .. }
                if matches!(
                    self.kind(),
                    ErrorKind::InvalidInput | ErrorKind::NotFound | ErrorKind::Conflict
                ) =>
            {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_wire_names() {
        let json = serde_json::to_string(&ErrorCode::InvalidInput).unwrap();
        assert_eq!(json, "\"ERR_INVALID_INPUT\"");

        let code: ErrorCode = serde_json::from_str("\"ERR_DUPLICATE\"").unwrap();
        assert_eq!(code, ErrorCode::Duplicate);
        assert_eq!(code.to_string(), "ERR_DUPLICATE");
    }

    #[test]
    fn test_public_message_hides_internal_detail() {
        let err = ServiceError::Database("connection refused on 10.0.0.3:5432".to_string());
        assert_eq!(err.code(), ErrorCode::Database);
        assert!(!err.public_message().contains("10.0.0.3"));

        let err = ServiceError::Internal("index out of bounds".to_string());
        assert!(!err.public_message().contains("index"));
    }

    #[test]
    fn test_rpc_error_kind_mapping() {
        let err = RpcError::Service {
            code: ErrorCode::Duplicate,
            message: "Category already exists".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.user_message(), Some("Category already exists"));

        let err = RpcError::Unavailable("timed out".to_string());
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
        assert_eq!(err.user_message(), None);

        let err = RpcError::Service {
            code: ErrorCode::Database,
            message: "A database error occurred".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.user_message(), None);
    }
}
