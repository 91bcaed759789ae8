//! The request/response values handed to injectors.

use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap};

/// Request-scoped values set by the host (middleware, auth layers, ...).
///
/// A target whose first parameter is a `RequestContext` receives it without
/// any injector being registered.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    extensions: Extensions,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            extensions: parts.extensions.clone(),
        }
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }
}

impl From<Extensions> for RequestContext {
    fn from(extensions: Extensions) -> Self {
        Self { extensions }
    }
}

/// Response side of the exchange. Headers written here are merged into the
/// response whatever its outcome.
#[derive(Debug, Default)]
pub struct ResponseSink {
    headers: HeaderMap,
}

impl ResponseSink {
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub(crate) fn into_headers(self) -> HeaderMap {
        self.headers
    }
}
