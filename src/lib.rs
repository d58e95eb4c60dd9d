pub mod api;
pub mod config;
pub mod db;
pub mod enums;
pub mod error;
pub mod notifier;
pub mod quote;
pub mod services;
pub mod stores;
pub mod tasks;

pub use config::Config;
pub use enums::Chain;
pub use error::{AppError, Result};
