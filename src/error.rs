// Error handling module
// Construction errors, transport errors and the failure side of a send

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while assembling a client, before any network activity
#[derive(Error, Debug)]
pub enum ClientError {
    /// A required credential or URL was not supplied
    #[error("Configuration error: {0} is required")]
    MissingField(&'static str),

    /// A base URL could not be parsed or cannot carry a path
    #[error("Configuration error: invalid {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    /// The underlying HTTP client could not be created
    #[error("Configuration error: failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Network-level failure: no usable HTTP response was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (kind: {kind})")]
pub struct TransportError {
    /// timeout, connection_failed, request_error, body_error, decode_error or unknown
    pub kind: &'static str,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connection_failed"
        } else if e.is_request() || e.is_builder() {
            "request_error"
        } else if e.is_body() {
            "body_error"
        } else if e.is_decode() {
            "decode_error"
        } else {
            "unknown"
        };
        Self::new(kind, e.to_string())
    }
}

/// Token acquisition failures
///
/// These never reach a caller of `send`; the token store logs them and keeps
/// the previous token.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Token request rejected: {status} - {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

/// Failure outcome of a send
#[derive(Error, Debug)]
pub enum SendError {
    /// The message cannot be sent as given (e.g. empty id)
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The payload could not be encoded; nothing was sent
    #[error("Invalid request: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network failure on either attempt
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The bearer token was rejected even after one refresh and retry
    #[error("Authorization failed: {message}")]
    Unauthorized { status: StatusCode, message: String },

    /// The remote returned a non-success status
    #[error("Harmony API error: {status} - {message}")]
    Remote { status: StatusCode, message: String },

    /// A success status whose body is not a receipt
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The task driving a dispatched send did not complete
    #[error("Send cancelled: {0}")]
    Cancelled(String),

    /// `dispatch` was called with no tokio runtime to run the send on
    #[error("No async runtime: {0}")]
    NoRuntime(String),
}

impl SendError {
    /// Bare failure message, without the category prefix
    pub fn reason(&self) -> String {
        match self {
            SendError::InvalidMessage(msg)
            | SendError::InvalidResponse(msg)
            | SendError::Cancelled(msg)
            | SendError::NoRuntime(msg) => msg.clone(),
            SendError::Serialization(e) => e.to_string(),
            SendError::Transport(e) => e.message.clone(),
            SendError::Unauthorized { message, .. } | SendError::Remote { message, .. } => {
                message.clone()
            }
        }
    }

    /// HTTP status of the response that caused the failure, if there was one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SendError::Unauthorized { status, .. } | SendError::Remote { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Result type alias for send operations
pub type Result<T> = std::result::Result<T, SendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SendError::Remote {
            status: StatusCode::BAD_REQUEST,
            message: "bad token".to_string(),
        };
        assert_eq!(err.to_string(), "Harmony API error: 400 Bad Request - bad token");
        assert_eq!(err.reason(), "bad token");
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

        let err = SendError::Unauthorized {
            status: StatusCode::FORBIDDEN,
            message: "expired".to_string(),
        };
        assert_eq!(err.to_string(), "Authorization failed: expired");
        assert_eq!(err.reason(), "expired");
    }

    #[test]
    fn test_transport_error_message() {
        let err = SendError::from(TransportError::new("timeout", "operation timed out"));
        assert_eq!(
            err.to_string(),
            "Transport error: operation timed out (kind: timeout)"
        );
        assert_eq!(err.reason(), "operation timed out");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_serialization_error_message() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SendError::from(json_err);
        assert!(err.to_string().starts_with("Invalid request: "));
    }

    #[test]
    fn test_no_runtime_message() {
        let err = SendError::NoRuntime("no reactor running".to_string());
        assert_eq!(err.to_string(), "No async runtime: no reactor running");
        assert_eq!(err.reason(), "no reactor running");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_config_error_message() {
        let err = ClientError::MissingField("client_id");
        assert_eq!(err.to_string(), "Configuration error: client_id is required");

        let err = ClientError::InvalidUrl {
            field: "auth_base_url",
            reason: "relative URL without a base".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration error: invalid auth_base_url: relative URL without a base"
        );
    }
}
