use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tiny_http::StatusCode;

/// Failure classes a request handler can end in.
///
/// None of these are retried by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid credentials.
    Unauthorized,
    /// Unreadable request body, or a filename that is not acceptable.
    BadRequest,
    /// Target file absent for fetch or remove.
    NotFound,
    /// Filesystem operation failed for reasons other than absence.
    Internal,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Unauthorized => {
                StatusCode(401)
            },
            ErrorKind::BadRequest => {
                StatusCode(400)
            },
            ErrorKind::NotFound => {
                StatusCode(404)
            },
            ErrorKind::Internal => {
                StatusCode(500)
            },
        }
    }

    /// Message used when a handler does not supply one.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::BadRequest => "Invalid request",
            ErrorKind::NotFound => "Not found",
            ErrorKind::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.default_message())
    }
}

/// A failed operation outcome.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct RequestError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RequestError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> RequestError {
        RequestError {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> RequestError {
        RequestError::new(ErrorKind::Unauthorized, "")
    }

    pub fn bad_request(message: impl Into<String>) -> RequestError {
        RequestError::new(ErrorKind::BadRequest, message)
    }

    pub fn not_found() -> RequestError {
        RequestError::new(ErrorKind::NotFound, "")
    }

    pub fn internal(message: impl Into<String>) -> RequestError {
        RequestError::new(ErrorKind::Internal, message)
    }

    /// The message sent to the client, falling back to the default for the kind.
    pub fn public_message(&self) -> &str {
        if self.message.is_empty() {
            return self.kind.default_message();
        }
        self.message.as_str()
    }

    /// Serialized `{"error": "..."}` envelope.
    pub fn envelope(&self) -> Vec<u8> {
        let body = ErrorBody {
            error: self.public_message(),
        };
        match serde_json::to_vec(&body) {
            Ok(v) => v,
            Err(_) => br#"{"error":"Internal error"}"#.to_vec(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}
