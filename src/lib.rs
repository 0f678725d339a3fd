// Core modules
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod logging;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use crate::config::StrategyConfig;
pub use crate::error::{ConfigError, ExecutionError, StrategyError};
pub use crate::models::*;
pub use crate::strategy::Strategy;

// Error handling
pub type Result<T> = std::result::Result<T, StrategyError>;
