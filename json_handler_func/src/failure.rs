//! Outcome indicators and their wire representation.

use std::error::Error;
use std::fmt;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An error a handler function can return as its outcome indicator.
///
/// The display text becomes the `error` field of the [`ErrorEnvelope`].
/// `payload` exposes structured detail as the `value` field, and
/// `status_code` lets an error pick the HTTP status of the response.
///
/// ```
/// use json_handler_func::Failure;
/// use serde::Serialize;
///
/// #[derive(Debug, Serialize, thiserror::Error)]
/// #[error("{reason}")]
/// struct Crashed {
///     code: i32,
///     reason: String,
/// }
///
/// impl Failure for Crashed {
///     fn payload(&self) -> Option<serde_json::Value> {
///         serde_json::to_value(self).ok()
///     }
/// }
/// ```
pub trait Failure: Error + Send + Sync + 'static {
    fn payload(&self) -> Option<Value> {
        None
    }

    fn status_code(&self) -> Option<StatusCode> {
        None
    }
}

pub type BoxFailure = Box<dyn Failure>;

/// Attaches an HTTP status code to another failure.
///
/// Message and payload are taken from the wrapped failure.
#[derive(Debug)]
pub struct StatusCodeError {
    status: StatusCode,
    inner: BoxFailure,
}

impl StatusCodeError {
    pub fn new<E: Failure>(status: StatusCode, inner: E) -> Self {
        Self {
            status,
            inner: Box::new(inner),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn inner(&self) -> &dyn Failure {
        self.inner.as_ref()
    }

    pub fn into_inner(self) -> BoxFailure {
        self.inner
    }
}

/// Shorthand for [`StatusCodeError::new`].
pub fn with_status<E: Failure>(status: StatusCode, err: E) -> StatusCodeError {
    StatusCodeError::new(status, err)
}

impl fmt::Display for StatusCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl Error for StatusCodeError {}

impl Failure for StatusCodeError {
    fn payload(&self) -> Option<Value> {
        self.inner.payload()
    }

    fn status_code(&self) -> Option<StatusCode> {
        Some(self.status)
    }
}

/// A failure that is nothing but a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage(String);

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for ErrorMessage {}

impl Failure for ErrorMessage {}

impl From<String> for ErrorMessage {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ErrorMessage {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl Failure for std::io::Error {}

impl Failure for serde_json::Error {}

/// Wire form of a failed outcome indicator: `{"error": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ErrorEnvelope {
    pub fn from_failure(failure: &dyn Failure) -> Self {
        Self {
            error: failure.to_string(),
            value: failure.payload(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize)]
    struct Crashed {
        code: i32,
        reason: String,
    }

    impl fmt::Display for Crashed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.reason)
        }
    }

    impl Error for Crashed {}

    impl Failure for Crashed {
        fn payload(&self) -> Option<Value> {
            serde_json::to_value(self).ok()
        }
    }

    #[test]
    fn envelope_omits_absent_payload() {
        let envelope = ErrorEnvelope::from_failure(&ErrorMessage::new("no gender"));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"error": "no gender"})
        );
    }

    #[test]
    fn envelope_carries_payload() {
        let err = Crashed {
            code: 8800,
            reason: "It crashed.".into(),
        };
        assert_eq!(
            serde_json::to_value(ErrorEnvelope::from_failure(&err)).unwrap(),
            json!({"error": "It crashed.", "value": {"code": 8800, "reason": "It crashed."}})
        );
    }

    #[test]
    fn status_wrapper_delegates_message_and_payload() {
        let err = with_status(
            StatusCode::FORBIDDEN,
            Crashed {
                code: 1,
                reason: "you can't access it".into(),
            },
        );
        assert_eq!(err.status_code(), Some(StatusCode::FORBIDDEN));
        assert_eq!(err.to_string(), "you can't access it");
        assert_eq!(err.payload(), Some(json!({"code": 1, "reason": "you can't access it"})));
        assert_eq!(err.inner().to_string(), "you can't access it");
    }

    #[test]
    fn plain_failures_have_no_status() {
        assert_eq!(ErrorMessage::from("x").status_code(), None);
    }
}
