use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::encode;
use crate::failure::Failure;

/// Raised while a handler is being built.
///
/// Every variant is a programming error in the registration code, so callers
/// normally `expect` the builder result at startup.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("{function}: last return value must be an error, found {found}")]
    MissingFailure {
        function: String,
        found: String,
    },

    #[error("{function}: {position} can not be a channel type, found {type_name}")]
    ChannelType {
        function: String,
        position: String,
        type_name: String,
    },

    #[error("{function}: an injector must accept (ResponseSink, Parts), found [{found}]")]
    InjectorParams {
        function: String,
        found: String,
    },

    #[error("{target} params type is [{expected}], but injecting [{injected}]")]
    InjectorMismatch {
        target: String,
        expected: String,
        injected: String,
    },

    #[error("a standalone injector can not be combined with {count} other injectors")]
    StandaloneWithInjectors { count: usize },
}

pub type Result<T> = std::result::Result<T, SetupError>;

/// Failures the pipeline itself produces while serving a request.
///
/// They are reported to the caller through the same `results` envelope as
/// the target function's own errors.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("{source}, func type: {function}")]
    Decode {
        source: serde_json::Error,
        function: String,
    },

    #[error("require {required} parameters, but only passed in {supplied} parameters: {params}")]
    Arity {
        required: usize,
        supplied: usize,
        params: Value,
    },

    #[error("argument {position} should be {expected}")]
    ArgumentType {
        position: usize,
        expected: &'static str,
    },

    #[error("failed to encode results: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Failure for HandlerError {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            HandlerError::Body(_) | HandlerError::Decode { .. } | HandlerError::Arity { .. } => {
                Some(StatusCode::UNPROCESSABLE_ENTITY)
            }
            HandlerError::ArgumentType { .. } | HandlerError::Encode(_) => {
                Some(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        encode::encode_failure(&Config::default(), Vec::new(), Box::new(self))
            .into_response(HeaderMap::new())
    }
}
