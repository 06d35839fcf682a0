//! HTTP handlers

pub mod account;
pub mod admin;
pub mod auth;
pub mod health;
pub mod products;
pub mod purchases;
pub mod stock;

use serde::Serialize;

pub use account::*;
pub use admin::*;
pub use auth::*;
pub use health::*;
pub use products::*;
pub use purchases::*;
pub use stock::*;

/// Plain acknowledgement body
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
