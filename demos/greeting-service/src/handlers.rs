use axum::http::HeaderValue;
use json_handler_func::{with_status, ErrorMessage, Parts, RequestContext, ResponseSink, StatusCode, StatusCodeError};
use serde_json::{json, Value};

use crate::dtos::{Greeting, Profile, RequestId};

/// Greets by name; gender 1 and 2 are known.
pub fn hello(name: String, gender: i32) -> Result<Greeting, ErrorMessage> {
    let message = match gender {
        1 => format!("Hi, Mr. {name}"),
        2 => format!("Hi, Mrs. {name}"),
        _ => return Err(ErrorMessage::new("Sorry, I don't know about your gender.")),
    };
    Ok(Greeting { message })
}

pub fn profile(name: String, p: Box<Profile>) -> Result<(String, i32), ErrorMessage> {
    Ok((format!("Hi, {name} from {}", p.address.address1), p.address.zipcode))
}

pub fn whoami(ctx: RequestContext, name: String) -> Result<String, ErrorMessage> {
    let id = ctx
        .get::<RequestId>()
        .map(|id| id.0.as_str())
        .unwrap_or("unknown");
    Ok(format!("Hello {name}, your request id is {id}"))
}

/// Reads the cart from the `x-cart-id` header and echoes it back.
pub fn cart_id(sink: &mut ResponseSink, parts: &Parts) -> Result<i32, StatusCodeError> {
    let header = parts
        .headers
        .get("x-cart-id")
        .ok_or_else(|| with_status(StatusCode::FORBIDDEN, ErrorMessage::new("missing cart")))?;
    let cart = header
        .to_str()
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
        .ok_or_else(|| with_status(StatusCode::BAD_REQUEST, ErrorMessage::new("bad cart id")))?;
    sink.headers_mut()
        .insert("x-cart-id", HeaderValue::from(cart));
    Ok(cart)
}

pub fn add_item(cart: i32, item: String, quantity: u32) -> Result<String, ErrorMessage> {
    if quantity == 0 {
        return Err(ErrorMessage::new("quantity must be positive"));
    }
    Ok(format!("{quantity} x {item} added to cart {cart}"))
}

/// Wraps any JSON payload together with the caller's request id.
pub fn echo(ctx: RequestContext, payload: Value) -> Result<Value, ErrorMessage> {
    let id = ctx.get::<RequestId>().map(|id| id.0.clone());
    Ok(json!({ "request_id": id, "payload": payload }))
}
