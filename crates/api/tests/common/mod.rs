//! Common test utilities for integration tests.
//!
//! Tests run against the in-memory directory, so no external identity
//! server is needed.

// Allow dead code in this module - these are helper utilities that may not be
// used by all integration tests but are intentionally available for future use.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use fake::faker::internet::en::SafeEmail;
use fake::Fake;

use directory::InMemoryDirectory;
use domain::models::OrgMember;
use sales_team_api::{app::create_app, config::Config};

/// Admin key accepted by the test configuration.
pub const ADMIN_KEY: &str = "st_test_admin_key";

/// Organization used by the standard scenario.
pub const ORG_ID: &str = "org-1";

/// Test configuration pointing at nothing; the directory is injected.
pub fn test_config() -> Config {
    Config {
        server: sales_team_api::config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 30,
        },
        directory: sales_team_api::config::DirectoryConfig {
            base_url: "http://localhost:0".to_string(),
            realm: "test".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            request_timeout_secs: 5,
            member_page_size: 1000,
        },
        logging: sales_team_api::config::LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: sales_team_api::config::SecurityConfig {
            cors_origins: vec![],
            admin_api_keys: vec![ADMIN_KEY.to_string()],
        },
    }
}

/// Create a test application router over the given directory.
pub fn create_test_app(directory: Arc<InMemoryDirectory>) -> Router {
    create_app(test_config(), directory)
}

pub fn member(id: &str, first: &str, last: &str) -> OrgMember {
    OrgMember {
        id: id.to_string(),
        username: Some(format!("{}.{}", first, last).to_lowercase()),
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        email: Some(SafeEmail().fake()),
        enabled: Some(true),
    }
}

/// Standard scenario: a root "Sales Manager" group, a "Salesman" group,
/// two managers and three salesmen, nobody assigned yet.
pub struct Scenario {
    pub directory: Arc<InMemoryDirectory>,
    pub root_group_id: String,
    pub salesman_group_id: String,
}

pub fn seed_scenario() -> Scenario {
    let directory = Arc::new(InMemoryDirectory::new());

    let root_group_id = directory.create_group("Sales Manager");
    let salesman_group_id = directory.create_group("Salesman");

    for (id, first, last, group) in [
        ("mgr-alice", "Alice", "Adams", &root_group_id),
        ("mgr-bob", "Bob", "Brown", &root_group_id),
        ("s-carl", "Carl", "Closer", &salesman_group_id),
        ("s-dana", "Dana", "Dealer", &salesman_group_id),
        ("s-evan", "Evan", "Eager", &salesman_group_id),
    ] {
        directory.insert_user(member(id, first, last));
        directory.add_org_member(ORG_ID, id);
        directory.join_group(id, group);
    }

    Scenario {
        directory,
        root_group_id,
        salesman_group_id,
    }
}

pub fn board_uri(organization_id: &str) -> String {
    format!(
        "/api/v1/organizations/{}/sales-manager-assignments",
        organization_id
    )
}

/// Build a GET request carrying the test admin key.
pub fn admin_get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("X-Admin-Key", ADMIN_KEY)
        .body(Body::empty())
        .unwrap()
}

/// Build a JSON POST request carrying the test admin key.
pub fn admin_post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Admin-Key", ADMIN_KEY)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Assignment request body shorthand.
pub fn assignment_body(action: &str, manager: &str, salesmen: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "action": action,
        "managerUserId": manager,
        "salesmanUserIds": salesmen,
    })
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
