//! Shared utilities for the analysis client
//!
//! This crate provides the ambient pieces used across the workspace: tracing
//! setup and the client configuration.

pub mod config;
pub mod logging;

pub use config::{ClientConfig, ClientConfigBuilder, ConfigError};
pub use logging::{init_tracing, init_tracing_with};
