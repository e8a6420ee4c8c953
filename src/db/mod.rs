mod accounts;
mod repository;
mod schema;
mod subscriptions;

pub use repository::Repository;
pub use subscriptions::Reconciliation;
pub(crate) use repository::parse_datetime;
