use json_handler_func::{json_param, Param};
use serde::{Deserialize, Serialize};

/// Only ever returned, so it is never decoded.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Greeting {
    pub message: String,
}

impl Param for Greeting {}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Address {
    pub zipcode: i32,
    pub address1: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Profile {
    pub name: String,
    pub address: Address,
}

json_param!(Address, Profile);

/// Set by the request-id middleware, read by context-first handlers.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);
