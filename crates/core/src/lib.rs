//! Core business logic for Contabil.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Ledger and chart-of-accounts data arrive through collaborator traits; reports
//! are computed on demand and never persisted.
//!
//! # Modules
//!
//! - `dre` - Income statement (DRE) aggregation, segment filtering and reconciliation

pub mod dre;
