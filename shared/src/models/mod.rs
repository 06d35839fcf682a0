//! Domain models for the canteen

mod account;
mod adjustment;
mod product;
mod shortage;
mod stock;
mod user;

pub use account::*;
pub use adjustment::*;
pub use product::*;
pub use shortage::*;
pub use stock::*;
pub use user::*;
