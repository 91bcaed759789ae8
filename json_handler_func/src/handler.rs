use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::extract::Request;
use axum::handler::Handler;
use axum::http::request::Parts;
use axum::response::Response;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::encode::{self, Encoded};
use crate::error::{HandlerError, Result, SetupError};
use crate::exchange::ResponseSink;
use crate::failure::Failure;
use crate::injector::{ContextInjector, Inject, InjectorChain, InjectorFn, IntoInjector, Produced, Standalone};
use crate::params::{decode_params, DecodedParams, SlotFactory};
use crate::shape::{self, FunctionDescriptor};
use crate::target::{assemble, Bound, Invoke, Results, Target};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

enum Mode {
    /// Injectors, then the body decoder, then the target.
    Call {
        target: Box<dyn Invoke>,
        chain: InjectorChain,
        slots: Vec<SlotFactory>,
    },
    /// A lone injector whose outputs are the results.
    Standalone(Box<dyn Standalone>),
}

struct Inner {
    descriptor: FunctionDescriptor,
    config: Config,
    mode: Mode,
}

/// An axum handler serving one function over the `{"params": [...]}` protocol.
///
/// ```
/// use axum::{routing::post, Router};
/// use json_handler_func::{ErrorMessage, JsonHandler};
///
/// fn greet(name: String, gender: i32) -> Result<String, ErrorMessage> {
///     match gender {
///         1 => Ok(format!("Hi, Mr. {name}")),
///         2 => Ok(format!("Hi, Mrs. {name}")),
///         _ => Err(ErrorMessage::new("Sorry, I don't know about your gender.")),
///     }
/// }
///
/// let app: Router = Router::new().route("/greet", post(JsonHandler::new(greet).unwrap()));
/// ```
#[derive(Clone)]
pub struct JsonHandler {
    inner: Arc<Inner>,
}

/// Collects configuration and injectors before the target is attached.
#[derive(Default)]
pub struct JsonHandlerBuilder {
    config: Config,
    injectors: Vec<Arc<dyn Inject>>,
}

impl JsonHandlerBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Appends an injector; its outputs become the next leading arguments.
    pub fn inject<F, T>(mut self, injector: F) -> Self
    where
        F: IntoInjector<T>,
    {
        self.injectors.push(injector.into_injector());
        self
    }

    pub fn inject_boxed(mut self, injector: Arc<dyn Inject>) -> Self {
        self.injectors.push(injector);
        self
    }

    /// Validates the target against the registered injectors.
    pub fn target<F, Args>(self, target: F) -> Result<JsonHandler>
    where
        F: Target<Args>,
        Args: 'static,
    {
        let descriptor = target.descriptor();
        shape::validate_target(&descriptor)?;

        let mut injectors = self.injectors;
        if injectors.is_empty() && descriptor.takes_context_first() {
            injectors.push(Arc::new(ContextInjector));
        }
        let chain = InjectorChain::new(injectors)?;
        chain.check_compatible(&descriptor)?;

        let slots = target.slots().split_off(chain.produced_len());
        debug!(
            function = %descriptor,
            injectors = chain.len(),
            decoded = slots.len(),
            "json handler built"
        );
        Ok(JsonHandler::from_inner(Inner {
            descriptor,
            config: self.config,
            mode: Mode::Call {
                target: Box::new(Bound::<F, Args>::new(target)),
                chain,
                slots,
            },
        }))
    }

    /// Serves an injector on its own: it is both the sole injector and the target.
    pub fn standalone<F, O, E>(self, injector: F) -> Result<JsonHandler>
    where
        F: Fn(&mut ResponseSink, &Parts) -> std::result::Result<O, E> + Send + Sync + 'static,
        O: Produced + Results,
        E: Failure,
    {
        if !self.injectors.is_empty() {
            return Err(SetupError::StandaloneWithInjectors {
                count: self.injectors.len(),
            });
        }
        let injector = InjectorFn::<F, O, E>::new(injector);
        let descriptor = Standalone::descriptor(&injector);
        shape::validate_injector(&descriptor)?;
        debug!(function = %descriptor, "standalone json handler built");
        Ok(JsonHandler::from_inner(Inner {
            descriptor,
            config: self.config,
            mode: Mode::Standalone(Box::new(injector)),
        }))
    }
}

impl JsonHandler {
    pub fn builder() -> JsonHandlerBuilder {
        JsonHandlerBuilder::default()
    }

    /// A handler for `target` with the default config and no injectors.
    pub fn new<F, Args>(target: F) -> Result<Self>
    where
        F: Target<Args>,
        Args: 'static,
    {
        Self::builder().target(target)
    }

    /// A handler whose only function is the injector itself.
    pub fn from_injector<F, O, E>(injector: F) -> Result<Self>
    where
        F: Fn(&mut ResponseSink, &Parts) -> std::result::Result<O, E> + Send + Sync + 'static,
        O: Produced + Results,
        E: Failure,
    {
        Self::builder().standalone(injector)
    }

    fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.inner.descriptor
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Serves one request. Never fails: every error is encoded in the body.
    pub async fn handle(&self, req: Request) -> Response {
        let (parts, body) = req.into_parts();
        let mut sink = ResponseSink::default();
        let encoded = self.inner.serve(&mut sink, &parts, body).await;
        encoded.into_response(sink.into_headers())
    }
}

impl Inner {
    async fn serve(&self, sink: &mut ResponseSink, parts: &Parts, body: Body) -> Encoded {
        match &self.mode {
            Mode::Standalone(injector) => {
                trace!(function = %self.descriptor, "running standalone injector");
                match injector.run(sink, parts) {
                    Ok(returns) => encode::encode(&self.config, returns),
                    Err(err) => self.reject(injector.zero(), err),
                }
            }
            Mode::Call {
                target,
                chain,
                slots,
            } => {
                trace!(function = %self.descriptor, "running injectors");
                let prefix = match chain.run(sink, parts) {
                    Ok(prefix) => prefix,
                    Err(failure) => {
                        warn!(function = %self.descriptor, error = %failure, "injector rejected request");
                        let zero = encode::placeholders(target.zero());
                        return encode::encode_failure(&self.config, zero, failure);
                    }
                };

                let decoded = if slots.is_empty() {
                    DecodedParams::default()
                } else {
                    trace!(function = %self.descriptor, "decoding params");
                    match self.decode(slots, body).await {
                        Ok(decoded) => decoded,
                        Err(err) => return self.reject(target.zero(), err),
                    }
                };

                let args = match assemble(prefix, decoded, self.descriptor.params().len()) {
                    Ok(args) => args,
                    Err(err) => return self.reject(target.zero(), err),
                };

                trace!(function = %self.descriptor, "invoking");
                match target.invoke(args) {
                    Ok(returns) => encode::encode(&self.config, returns),
                    Err(err) => self.reject(target.zero(), err),
                }
            }
        }
    }

    async fn decode(&self, slots: &[SlotFactory], body: Body) -> std::result::Result<DecodedParams, HandlerError> {
        let bytes = body::to_bytes(body, self.config.body_limit())
            .await
            .map_err(HandlerError::Body)?;
        decode_params(&bytes, slots.iter().map(|slot| slot()).collect()).map_err(|source| {
            HandlerError::Decode {
                source,
                function: self.descriptor.to_string(),
            }
        })
    }

    fn reject(&self, zero: serde_json::Result<Vec<Value>>, err: HandlerError) -> Encoded {
        if !matches!(err, HandlerError::Encode(_)) {
            warn!(function = %self.descriptor, error = %err, "request failed");
        }
        encode::encode_internal(&self.config, zero, err)
    }
}

impl<S> Handler<(), S> for JsonHandler
where
    S: Clone + Send + Sync + 'static,
{
    type Future = BoxFuture<'static, Response>;

    fn call(self, req: Request, _state: S) -> Self::Future {
        Box::pin(async move { self.handle(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::RequestContext;
    use crate::failure::ErrorMessage;

    fn cart_id(_: &mut ResponseSink, _: &Parts) -> std::result::Result<i32, ErrorMessage> {
        Ok(20)
    }

    fn add(cart: i32, n: i32) -> std::result::Result<i32, ErrorMessage> {
        Ok(cart + n)
    }

    #[test]
    fn injected_params_are_not_decoded() {
        let handler = JsonHandler::builder().inject(cart_id).target(add).unwrap();
        match &handler.inner.mode {
            Mode::Call { slots, chain, .. } => {
                assert_eq!(slots.len(), 1);
                assert_eq!(chain.len(), 1);
            }
            Mode::Standalone(_) => panic!("expected call mode"),
        }
    }

    #[test]
    fn context_first_gets_an_implicit_injector() {
        let read = |ctx: RequestContext, key: String| -> std::result::Result<String, ErrorMessage> {
            Ok(ctx.get::<String>().cloned().unwrap_or(key))
        };
        let handler = JsonHandler::new(read).unwrap();
        match &handler.inner.mode {
            Mode::Call { slots, chain, .. } => {
                assert_eq!(chain.produced_len(), 1);
                assert_eq!(slots.len(), 1);
            }
            Mode::Standalone(_) => panic!("expected call mode"),
        }
    }

    #[test]
    fn standalone_refuses_extra_injectors() {
        let err = JsonHandler::builder()
            .inject(cart_id)
            .standalone(cart_id)
            .err()
            .unwrap();
        assert!(matches!(err, SetupError::StandaloneWithInjectors { count: 1 }));
        assert!(JsonHandler::from_injector(cart_id).is_ok());
    }

    #[test]
    fn clones_share_the_descriptor() {
        let handler = JsonHandler::new(add).unwrap();
        let clone = handler.clone();
        assert!(Arc::ptr_eq(&handler.inner, &clone.inner));
        assert_eq!(handler.descriptor().params().len(), 2);
        assert_eq!(handler.config().body_limit(), crate::config::DEFAULT_BODY_LIMIT);
    }
}
