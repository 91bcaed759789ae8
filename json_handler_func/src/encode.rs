//! Builds the `{"results": [...]}` response.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::HandlerError;
use crate::failure::{BoxFailure, ErrorEnvelope};
use crate::target::Returns;

#[derive(Serialize)]
struct ResultsBody {
    results: Vec<Value>,
}

/// A response ready to be written: status and serialized body.
#[derive(Debug)]
pub struct Encoded {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Encoded {
    /// `headers` come from the response sink and are merged last.
    pub fn into_response(self, headers: HeaderMap) -> Response {
        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            Body::from(self.body),
        )
            .into_response();
        response.headers_mut().extend(headers);
        response
    }
}

/// Encodes what a call produced, success or failure.
pub fn encode(config: &Config, returns: Returns) -> Encoded {
    match returns.failure {
        None => {
            let mut results = returns.values;
            results.push(Value::Null);
            write(config.default_status(), results)
        }
        Some(failure) => encode_failure(config, returns.values, failure),
    }
}

/// Appends the failure's envelope to `zero`, the placeholder results.
///
/// The status comes from the failure as returned; the envelope from its
/// translated form.
pub fn encode_failure(config: &Config, zero: Vec<Value>, failure: BoxFailure) -> Encoded {
    let status = failure
        .status_code()
        .unwrap_or_else(|| config.default_status());
    let failure = config.translate(failure);
    let envelope = ErrorEnvelope::from_failure(failure.as_ref());
    let envelope = serde_json::to_value(&envelope).unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to encode error envelope");
        Value::Null
    });
    let mut results = zero;
    results.push(envelope);
    write(status, results)
}

/// Reports a pipeline failure with zero placeholders for the declared results.
///
/// If even the placeholders fail to encode, the envelope is sent alone.
pub(crate) fn encode_internal(
    config: &Config,
    zero: serde_json::Result<Vec<Value>>,
    err: HandlerError,
) -> Encoded {
    if let HandlerError::Encode(source) = &err {
        tracing::error!(error = %source, "failed to encode results");
    }
    encode_failure(config, placeholders(zero), Box::new(err))
}

pub(crate) fn placeholders(zero: serde_json::Result<Vec<Value>>) -> Vec<Value> {
    zero.unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to encode zero results");
        Vec::new()
    })
}

fn write(status: StatusCode, results: Vec<Value>) -> Encoded {
    let body = match serde_json::to_vec(&ResultsBody { results }) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(error = %err, "failed to write results body");
            br#"{"results":[]}"#.to_vec()
        }
    };
    Encoded { status, body }
}
