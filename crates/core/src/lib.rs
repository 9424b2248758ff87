//! vaultqa core library
//!
//! Shared foundations for the vaultqa workspace:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Application configuration

pub mod config;
pub mod error;
pub mod logging;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
