//! Shared types, errors, and configuration for Contabil.
//!
//! This crate provides common types used across all other crates:
//! - Minor-unit money arithmetic
//! - Typed IDs for ledger entities
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::AppError;
