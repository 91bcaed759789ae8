//! # json_handler_func - Plain Functions as JSON-Call Handlers
//!
//! `json_handler_func` turns an ordinary Rust function into an `axum` handler
//! for a positional JSON call protocol. Callers post
//! `{"params": [v1, ..., vN]}`; each element is decoded into the matching
//! parameter type, the function runs, and its results come back as
//! `{"results": [r1, ..., rK, trailer]}` where the trailer is `null` or an
//! error envelope `{"error": ..., "value": ...}`.
//!
//! ## Core Features:
//!
//! - **`JsonHandler`**: wraps any `Fn(A1, .., An) -> Result<R, E>` whose
//!   parameters implement [`Param`] and whose error implements [`Failure`].
//!
//! - **Injectors**: functions of `(&mut ResponseSink, &Parts)` that supply the
//!   leading arguments (session, auth, request-scoped values) before the
//!   body is decoded. They chain in declaration order and may reject a
//!   request early.
//!
//! - **Shape validation**: targets and injectors are checked when the handler
//!   is built, so a bad registration fails at startup, not per request.
//!
//! ```
//! use axum::{http::request::Parts, routing::post, Router};
//! use json_handler_func::{ErrorMessage, JsonHandler, ResponseSink};
//!
//! fn cart_id(_: &mut ResponseSink, _: &Parts) -> Result<i32, ErrorMessage> {
//!     Ok(20)
//! }
//!
//! fn add_item(cart: i32, item: String) -> Result<String, ErrorMessage> {
//!     Ok(format!("{item} added to cart {cart}"))
//! }
//!
//! let handler = JsonHandler::builder()
//!     .inject(cart_id)
//!     .target(add_item)
//!     .expect("valid handler");
//! let app: Router = Router::new().route("/cart/add", post(handler));
//! ```

pub mod config;
pub mod encode;
pub mod error;
pub mod exchange;
pub mod failure;
pub mod handler;
pub mod injector;
pub mod params;
pub mod shape;
pub mod target;

pub use axum::http::request::Parts;
pub use axum::http::StatusCode;

pub use config::{Config, ConfigBuilder};
pub use error::{HandlerError, SetupError};
pub use exchange::{RequestContext, ResponseSink};
pub use failure::{with_status, BoxFailure, ErrorEnvelope, ErrorMessage, Failure, StatusCodeError};
pub use handler::{JsonHandler, JsonHandlerBuilder};
pub use injector::{Inject, IntoInjector, Produced};
pub use params::{Arg, Param, ParameterSlot, SlotFactory};
pub use shape::{FunctionDescriptor, Kind, TypeTag};
pub use target::{Results, Returns, Target};
