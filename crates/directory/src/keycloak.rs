//! Keycloak admin REST implementation of the directory port.
//!
//! Authenticates with client credentials against the realm token endpoint
//! and caches the access token until shortly before expiry. All calls go
//! to the admin API under `/admin/realms/{realm}`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use domain::models::{DirectoryGroup, GroupRef, NewChildGroup, OrgMember};

use crate::client::DirectoryApi;
use crate::error::DirectoryError;

/// Safety margin subtracted from token lifetimes to avoid using a token
/// that expires mid-request.
const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Connection settings for the Keycloak admin API.
#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    /// Base URL of the Keycloak server, e.g. `https://id.example.com`.
    pub base_url: String,
    /// Realm holding the organizations and sales groups.
    pub realm: String,
    /// Service-account client id with admin API permissions.
    pub client_id: String,
    /// Client secret for the service account.
    pub client_secret: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    60
}

/// Error body shapes the Keycloak admin API uses.
#[derive(Debug, Deserialize)]
struct KeycloakErrorBody {
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// User representation on the Keycloak wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeycloakUser {
    id: String,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    enabled: Option<bool>,
}

impl From<KeycloakUser> for OrgMember {
    fn from(user: KeycloakUser) -> Self {
        OrgMember {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            enabled: user.enabled,
        }
    }
}

/// Group representation on the Keycloak wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeycloakGroup {
    id: String,
    name: String,
    path: Option<String>,
    #[serde(default)]
    attributes: std::collections::HashMap<String, Vec<String>>,
}

impl From<KeycloakGroup> for DirectoryGroup {
    fn from(group: KeycloakGroup) -> Self {
        DirectoryGroup {
            id: group.id,
            name: group.name,
            path: group.path,
            attributes: group.attributes,
        }
    }
}

/// Keycloak-backed directory client.
pub struct KeycloakDirectory {
    http: Client,
    config: KeycloakConfig,
    token: RwLock<Option<CachedToken>>,
}

impl KeycloakDirectory {
    /// Builds a client with the configured request timeout.
    pub fn new(config: KeycloakConfig) -> Result<Self, DirectoryError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
        })
    }

    fn admin_url(&self, path: &str) -> String {
        format!(
            "{}/admin/realms/{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.realm,
            path
        )
    }

    fn token_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.config.base_url.trim_end_matches('/'),
            self.config.realm
        )
    }

    /// Returns a valid access token, fetching a fresh one when the cached
    /// token is absent or about to expire.
    async fn bearer_token(&self) -> Result<String, DirectoryError> {
        if let Some(token) = self.token.read().await.as_ref() {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        let mut cache = self.token.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = cache.as_ref() {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        debug!(realm = %self.config.realm, "Fetching directory admin token");
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = error_message(response).await;
            return Err(DirectoryError::Auth(format!(
                "token endpoint returned {}: {}",
                status, message
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(format!("token payload: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in)
            .checked_sub(TOKEN_EXPIRY_SKEW)
            .unwrap_or(Duration::ZERO);
        let cached = CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        };
        *cache = Some(cached);

        Ok(token.access_token)
    }

    /// Sends an authorized request and deserializes a JSON response.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DirectoryError> {
        let token = self.bearer_token().await?;
        let response = self
            .http
            .get(self.admin_url(path))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))
    }

    /// Sends an authorized request whose response body is irrelevant.
    async fn send_command(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), DirectoryError> {
        let token = self.bearer_token().await?;
        let mut request = self
            .http
            .request(method, self.admin_url(path))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }
        Ok(())
    }
}

/// Extracts the most specific error message Keycloak offers.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(text) if !text.is_empty() => {
            match serde_json::from_str::<KeycloakErrorBody>(&text) {
                Ok(body) => body
                    .error_message
                    .or(body.error_description)
                    .or(body.error)
                    .unwrap_or(text),
                Err(_) => text,
            }
        }
        _ => default_status_message(status),
    }
}

async fn upstream_error(response: reqwest::Response) -> DirectoryError {
    let status = response.status().as_u16();
    let message = error_message(response).await;
    warn!(status = status, message = %message, "Directory request rejected");
    DirectoryError::Upstream { status, message }
}

fn default_status_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("unexpected directory response")
        .to_string()
}

#[async_trait]
impl DirectoryApi for KeycloakDirectory {
    async fn list_org_members(
        &self,
        organization_id: &str,
        first: usize,
        max: usize,
    ) -> Result<Vec<OrgMember>, DirectoryError> {
        let users: Vec<KeycloakUser> = self
            .get_json(&format!(
                "/organizations/{}/members?first={}&max={}",
                organization_id, first, max
            ))
            .await?;
        Ok(users.into_iter().map(OrgMember::from).collect())
    }

    async fn list_user_groups(&self, user_id: &str) -> Result<Vec<GroupRef>, DirectoryError> {
        let groups: Vec<KeycloakGroup> = self
            .get_json(&format!(
                "/users/{}/groups?briefRepresentation=true",
                user_id
            ))
            .await?;
        Ok(groups
            .into_iter()
            .map(|g| GroupRef { id: g.id, name: g.name })
            .collect())
    }

    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>, DirectoryError> {
        let groups: Vec<KeycloakGroup> =
            self.get_json("/groups?briefRepresentation=false").await?;
        Ok(groups.into_iter().map(DirectoryGroup::from).collect())
    }

    async fn list_group_children(
        &self,
        group_id: &str,
    ) -> Result<Vec<DirectoryGroup>, DirectoryError> {
        let groups: Vec<KeycloakGroup> = self
            .get_json(&format!(
                "/groups/{}/children?briefRepresentation=false",
                group_id
            ))
            .await?;
        Ok(groups.into_iter().map(DirectoryGroup::from).collect())
    }

    async fn list_group_members(&self, group_id: &str) -> Result<Vec<OrgMember>, DirectoryError> {
        let users: Vec<KeycloakUser> = self
            .get_json(&format!("/groups/{}/members?max=1000", group_id))
            .await?;
        Ok(users.into_iter().map(OrgMember::from).collect())
    }

    async fn create_child_group(
        &self,
        parent_id: &str,
        group: &NewChildGroup,
    ) -> Result<(), DirectoryError> {
        self.send_command(
            Method::POST,
            &format!("/groups/{}/children", parent_id),
            Some(serde_json::to_value(group).map_err(|e| {
                DirectoryError::InvalidResponse(format!("child group payload: {}", e))
            })?),
        )
        .await
    }

    async fn add_user_to_group(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> Result<(), DirectoryError> {
        self.send_command(
            Method::PUT,
            &format!("/users/{}/groups/{}", user_id, group_id),
            None,
        )
        .await
    }

    async fn remove_user_from_group(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> Result<(), DirectoryError> {
        self.send_command(
            Method::DELETE,
            &format!("/users/{}/groups/{}", user_id, group_id),
            None,
        )
        .await
    }
}
