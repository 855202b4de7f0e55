//! Typed error definitions for Shardroute configuration.

mod config;

pub use config::ConfigError;

/// Standard Result type using ConfigError.
pub type Result<T> = std::result::Result<T, ConfigError>;
