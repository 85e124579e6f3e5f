//! Client error type.
//!
//! Every rejection from the HTTP layer or a store is a [`ClientError`]. The
//! variants carry enough of the server's answer for `handle_error` to build a
//! user-facing message without re-reading the response.

use serde_json::Value;
use warden_core::WardenError;

/// Error code tagged on failures whose message mentions a server error.
pub const SERVER_ERROR_CODE: &str = "500";

/// Error code of an expired session.
pub const SESSION_EXPIRED_CODE: &str = "777";

/// Errors raised by the remote client and entity stores.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// The request was superseded by an identical newer one
    #[error("Request cancelled")]
    Cancelled,

    /// The server answered outside the 2xx range
    #[error("{message}")]
    Status {
        /// HTTP status
        status: u16,
        /// Server message, or a generic one naming the status
        message: String,
        /// Parsed response body
        data: Value,
        /// Normalized error code (`"500"`, or the server's own code)
        error_code: Option<String>,
    },

    /// The request never produced a response
    #[error("Transport error: {message}")]
    Transport {
        /// Underlying failure
        message: String,
    },

    /// The server redirected to its login page or reported code 777
    #[error("Session expired")]
    SessionExpired,

    /// The response could not be turned into records
    #[error("Decode error: {message}")]
    Decode {
        /// What failed to decode
        message: String,
    },

    /// The store has no base URL to build request paths from
    #[error("No base URL configured for store")]
    MissingBaseUrl,
}

impl ClientError {
    /// Create a status error, tagging `"500"` when the message mentions it.
    pub fn status(status: u16, message: impl Into<String>, data: Value) -> Self {
        let message = message.into();
        let error_code = server_error_code(&data).or_else(|| {
            message
                .contains(SERVER_ERROR_CODE)
                .then(|| SERVER_ERROR_CODE.to_string())
        });
        Self::Status {
            status,
            message,
            data,
            error_code,
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// The normalized error code, if any.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Status { error_code, .. } => error_code.as_deref(),
            Self::SessionExpired => Some(SESSION_EXPIRED_CODE),
            Self::Transport { message } if message.contains(SERVER_ERROR_CODE) => {
                Some(SERVER_ERROR_CODE)
            }
            _ => None,
        }
    }

    /// Whether this is a superseded request rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether the session has expired.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// HTTP status, when the server answered.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The parsed error body, `Null` when there is none.
    pub fn data(&self) -> &Value {
        match self {
            Self::Status { data, .. } => data,
            _ => &Value::Null,
        }
    }
}

/// Server code carried in a structured error body (`errorCode` or `code`).
fn server_error_code(data: &Value) -> Option<String> {
    ["errorCode", "code"]
        .iter()
        .filter_map(|key| data.get(key))
        .find_map(|code| match code {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

impl From<ClientError> for WardenError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Decode { message } => WardenError::serialization(message),
            ClientError::MissingBaseUrl => WardenError::config(err.to_string()),
            other => WardenError::network(other.to_string()),
        }
    }
}

/// Result alias for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_500_is_tagged_from_message() {
        let err = ClientError::status(500, "Request failed with status code 500", Value::Null);
        assert_eq!(err.error_code(), Some("500"));
        assert_eq!(err.http_status(), Some(500));
    }

    #[test]
    fn test_server_code_wins() {
        let err = ClientError::status(400, "bad", json!({"errorCode": "POLICY_EXISTS"}));
        assert_eq!(err.error_code(), Some("POLICY_EXISTS"));
    }

    #[test]
    fn test_plain_4xx_has_no_code() {
        let err = ClientError::status(404, "Request failed with status code 404", Value::Null);
        assert_eq!(err.error_code(), None);
    }

    #[test]
    fn test_session_and_cancel_flags() {
        assert_eq!(ClientError::SessionExpired.error_code(), Some("777"));
        assert!(ClientError::Cancelled.is_cancelled());
        assert!(!ClientError::SessionExpired.is_cancelled());
    }

    #[test]
    fn test_into_warden_error() {
        let err: WardenError = ClientError::MissingBaseUrl.into();
        assert!(matches!(err, WardenError::Config { .. }));
    }
}
