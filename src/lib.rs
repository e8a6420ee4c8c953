pub mod ai;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod payments;
pub mod pipeline;
pub mod sources;
pub mod web;

pub use app::App;
pub use config::Config;
pub use error::{AppError, Result};
