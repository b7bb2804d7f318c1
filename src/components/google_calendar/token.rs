use crate::config::Config;
use crate::error::{auth_error, SyncResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Tokens this close to expiry are refreshed
const EXPIRY_SKEW_SECS: i64 = 60;

/// Supplies bearer credentials for the calendar API
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> SyncResult<String>;
}

/// OAuth token as kept on disk.
///
/// Reads both this tool's layout (`access_token`, `expires_at`) and the
/// authorized-user layout written by Google's client libraries (`token`,
/// `expiry`, `client_id`, `client_secret`, `token_uri`). A refresh writes the
/// new values back under the keys the file already used, and unknown fields
/// are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Access token under the authorized-user key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredToken {
    /// Access token from either layout
    pub fn active_token(&self) -> Option<&str> {
        self.access_token.as_deref().or(self.token.as_deref())
    }

    fn uses_authorized_user_layout(&self) -> bool {
        self.access_token.is_none() && self.token.is_some()
    }

    /// Expiry as a unix timestamp, from either layout
    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at.or_else(|| {
            self.expiry
                .as_deref()
                .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
                .map(|dt| dt.timestamp())
        })
    }

    /// A token without an expiry is trusted until the API rejects it
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if self.active_token().map_or(true, str::is_empty) {
            return false;
        }
        match self.expires_at() {
            Some(expires_at) => expires_at > now.timestamp() + EXPIRY_SKEW_SECS,
            None => true,
        }
    }

    /// Apply a token endpoint response
    fn apply_refresh(&mut self, response: RefreshResponse, now: DateTime<Utc>) {
        let authorized_user = self.uses_authorized_user_layout();
        let expires_at = now.timestamp() + response.expires_in.unwrap_or(3600);

        if authorized_user {
            self.token = Some(response.access_token);
        } else {
            self.access_token = Some(response.access_token);
        }
        if let Some(refresh_token) = response.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if authorized_user || self.expiry.is_some() {
            // Google's libraries expect a UTC timestamp with a `Z` suffix
            self.expiry = DateTime::<Utc>::from_timestamp(expires_at, 0)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        if !authorized_user || self.expires_at.is_some() {
            self.expires_at = Some(expires_at);
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

/// Token provider backed by a JSON file, refreshing and rewriting it as needed
#[derive(Debug)]
pub struct TokenManager {
    path: PathBuf,
    client_id: String,
    client_secret: String,
    client: Client,
    cached: Mutex<Option<StoredToken>>,
}

impl TokenManager {
    pub fn new(config: &Config) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| auth_error(&format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            path: PathBuf::from(&config.token_path),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            client,
            cached: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the token file
    pub fn load(&self) -> SyncResult<StoredToken> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            auth_error(&format!("Failed to read token file {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            auth_error(&format!("Failed to parse token file {}: {}", self.path.display(), e))
        })
    }

    /// Write the token file, replacing it in one step
    pub fn set_token(&self, token: &StoredToken) -> SyncResult<()> {
        let json = serde_json::to_string_pretty(token)
            .map_err(|e| auth_error(&format!("Failed to serialize token: {}", e)))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                auth_error(&format!("Failed to save token file {}: {}", self.path.display(), e))
            })
    }

    /// Exchange the refresh token for a new access token and persist it
    async fn refresh_token(&self, token: &StoredToken) -> SyncResult<StoredToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| auth_error("Token expired and no refresh token is available"))?;

        let client_id = token.client_id.clone().unwrap_or_else(|| self.client_id.clone());
        let client_secret = token
            .client_secret
            .clone()
            .unwrap_or_else(|| self.client_secret.clone());
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(auth_error(
                "Refreshing requires GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET or a token file carrying them",
            ));
        }

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token.to_string()),
            ("grant_type", "refresh_token".to_string()),
        ];

        let token_uri = token.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let response = self
            .client
            .post(token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| auth_error(&format!("Failed to refresh token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(auth_error(&format!(
                "Failed to refresh token: HTTP {} - {}",
                status, error_body
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| auth_error(&format!("Failed to parse token response: {}", e)))?;

        let mut token = token.clone();
        token.apply_refresh(refreshed, Utc::now());
        self.set_token(&token)?;
        info!("Refreshed access token and saved it to {}", self.path.display());

        Ok(token)
    }
}

#[async_trait]
impl TokenProvider for TokenManager {
    async fn access_token(&self) -> SyncResult<String> {
        let mut cached = self.cached.lock().await;

        let token = match cached.take() {
            Some(token) => token,
            None => self.load()?,
        };
        let token = if token.is_valid(Utc::now()) {
            token
        } else {
            self.refresh_token(&token).await?
        };

        let access_token = token
            .active_token()
            .map(str::to_string)
            .ok_or_else(|| auth_error("No access token available"))?;
        *cached = Some(token);

        Ok(access_token)
    }
}
