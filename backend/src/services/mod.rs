//! Business logic services for the canteen

pub mod account;
pub mod auth;
pub mod batches;
pub mod notification;
pub mod product;
pub mod purchase;
pub mod reconciliation;
pub mod reminder;
pub mod shortage;
pub mod stock;

pub use account::AccountService;
pub use auth::AuthService;
pub use notification::Notifier;
pub use product::ProductService;
pub use purchase::PurchaseService;
pub use reconciliation::ReconciliationService;
pub use reminder::ReminderService;
pub use shortage::ShortageService;
pub use stock::StockService;
