//! HTTP route handlers.

pub mod assignments;
pub mod health;
