//! Core types and shared functionality for pagewarp.
//!
//! This crate provides:
//! - In-memory response cache with time-based expiry
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheEntry, Payload, ResponseCache};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
