//! Shared domain logic for the canteen
//!
//! Everything that decides what happens to stock and money lives here, free
//! of I/O: models, FIFO pricing, reconciliation planning, shortage
//! attribution, ledger folds and input validation. The backend owns storage
//! and transactions and calls into this crate for every decision.

pub mod ledger;
pub mod models;
pub mod pricing;
pub mod reconciliation;
pub mod shortage;
pub mod types;
pub mod validation;

pub use models::*;
pub use pricing::{PriceQuote, PricingError, PurchasePlan};
pub use types::*;
pub use validation::*;
