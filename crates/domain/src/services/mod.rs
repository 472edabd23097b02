//! Domain services.

pub mod roles;
