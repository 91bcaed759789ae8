use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::failure::BoxFailure;

/// Rewrites a failure before it is placed in the response envelope.
pub type TranslateFn = Arc<dyn Fn(BoxFailure) -> BoxFailure + Send + Sync>;

pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Per-handler settings, fixed once the handler is built.
#[derive(Clone)]
pub struct Config {
    translate: Option<TranslateFn>,
    default_status: StatusCode,
    body_limit: usize,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Passes the failure through the translation hook, if any.
    pub fn translate(&self, failure: BoxFailure) -> BoxFailure {
        match &self.translate {
            Some(translate) => translate(failure),
            None => failure,
        }
    }

    pub fn has_translate(&self) -> bool {
        self.translate.is_some()
    }

    pub fn default_status(&self) -> StatusCode {
        self.default_status
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            translate: None,
            default_status: StatusCode::OK,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("translate", &self.translate.is_some())
            .field("default_status", &self.default_status)
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a hook mapping every failure to the one reported to callers.
    ///
    /// The response status is still taken from the failure as returned.
    pub fn translate<F>(mut self, translate: F) -> Self
    where
        F: Fn(BoxFailure) -> BoxFailure + Send + Sync + 'static,
    {
        self.config.translate = Some(Arc::new(translate));
        self
    }

    pub fn default_status(mut self, status: StatusCode) -> Self {
        self.config.default_status = status;
        self
    }

    /// Maximum request body size in bytes.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.config.body_limit = limit;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::ErrorMessage;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.default_status(), StatusCode::OK);
        assert_eq!(config.body_limit(), DEFAULT_BODY_LIMIT);
        assert!(!config.has_translate());
        let failure = config.translate(Box::new(ErrorMessage::new("kept")));
        assert_eq!(failure.to_string(), "kept");
    }

    #[test]
    fn builder_overrides() {
        let config = Config::builder()
            .default_status(StatusCode::ACCEPTED)
            .body_limit(16)
            .translate(|failure: BoxFailure| -> BoxFailure {
                Box::new(ErrorMessage::new(format!("wrapped: {failure}")))
            })
            .build();
        assert_eq!(config.default_status(), StatusCode::ACCEPTED);
        assert_eq!(config.body_limit(), 16);
        let failure = config.translate(Box::new(ErrorMessage::new("inner")));
        assert_eq!(failure.to_string(), "wrapped: inner");
        assert!(format!("{config:?}").contains("translate: true"));
    }
}
