//! Domain layer for the Sales Team backend.
//!
//! This crate contains:
//! - Directory-facing domain models (members, groups, user summaries)
//! - Assignment view and mutation DTOs
//! - The sales-role classifier

pub mod models;
pub mod services;
