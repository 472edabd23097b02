//! Directory client layer for the Sales Team backend.
//!
//! The external identity directory (a Keycloak-style admin REST API) is
//! the sole system of record for organizations, users, groups, and group
//! memberships. This crate provides:
//! - The `DirectoryApi` port consumed by the API layer
//! - A Keycloak admin REST implementation over HTTP
//! - An in-memory implementation for tests and local development

pub mod client;
pub mod error;
pub mod keycloak;
pub mod memory;

pub use client::DirectoryApi;
pub use error::DirectoryError;
pub use keycloak::{KeycloakConfig, KeycloakDirectory};
pub use memory::InMemoryDirectory;
