use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use json_handler_func::{Config, JsonHandler, SetupError};
use tower_http::cors::{Any, CorsLayer};

pub mod dtos;
pub mod handlers;

use dtos::RequestId;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

async fn request_id(mut req: Request, next: Next) -> Response {
    let id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
    req.extensions_mut().insert(RequestId(format!("req-{id}")));
    next.run(req).await
}

pub fn default_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Mounts every demo function under `/v1`.
pub fn build_router(config: Config) -> Result<Router, SetupError> {
    let hello = JsonHandler::builder()
        .config(config.clone())
        .target(handlers::hello)?;
    let profile = JsonHandler::builder()
        .config(config.clone())
        .target(handlers::profile)?;
    let whoami = JsonHandler::builder()
        .config(config.clone())
        .target(handlers::whoami)?;
    let echo = JsonHandler::builder()
        .config(config.clone())
        .target(handlers::echo)?;
    let add_item = JsonHandler::builder()
        .config(config.clone())
        .inject(handlers::cart_id)
        .target(handlers::add_item)?;
    let cart = JsonHandler::builder()
        .config(config)
        .standalone(handlers::cart_id)?;

    Ok(Router::new()
        .route("/v1/hello", post(hello))
        .route("/v1/profile", post(profile))
        .route("/v1/whoami", post(whoami))
        .route("/v1/echo", post(echo))
        .route("/v1/cart/add", post(add_item))
        .route("/v1/cart", post(cart))
        .layer(middleware::from_fn(request_id))
        .layer(default_cors_layer()))
}
