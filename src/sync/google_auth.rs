use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::storage::config::GoogleConfig;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read token file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse token: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Token has expired")]
    TokenExpired,
    #[error("No refresh token available")]
    NoRefreshToken,
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("OAuth error: {0}")]
    OAuthError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
}

impl TokenInfo {
    pub fn new(access_token: String, expires_in_seconds: i64) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in_seconds),
            token_type: "Bearer".to_string(),
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: String) -> Self {
        self.refresh_token = Some(refresh_token);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now()
    }

    /// Expiring within five minutes counts as due.
    pub fn needs_refresh(&self) -> bool {
        self.expires_at <= Utc::now() + chrono::Duration::minutes(5)
    }
}

/// Token cache on disk. The cache is written by an external consent flow and
/// refreshed in place.
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn save_token(&self, token: &TokenInfo) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn load_token(&self) -> Result<TokenInfo, AuthError> {
        let content = std::fs::read_to_string(&self.path)?;
        let token: TokenInfo = serde_json::from_str(&content)?;
        Ok(token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

pub struct GoogleAuthenticator {
    client_id: String,
    client_secret: String,
    token_endpoint: String,
    storage: TokenStorage,
    client: reqwest::Client,
}

impl GoogleAuthenticator {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
            storage: TokenStorage::new(config.token_cache.clone()),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_token_endpoint(mut self, endpoint: String) -> Self {
        self.token_endpoint = endpoint;
        self
    }

    /// Returns a usable access token, refreshing it first when it is close to
    /// expiry and a refresh token is cached.
    pub async fn get_valid_token(&self) -> Result<TokenInfo, AuthError> {
        let token = self.storage.load_token()?;

        if token.needs_refresh() && token.refresh_token.is_some() {
            match self.refresh_token(&token).await {
                Ok(refreshed) => return Ok(refreshed),
                Err(e) if token.is_valid() => {
                    tracing::warn!("Token refresh failed, using cached token: {}", e);
                    return Ok(token);
                }
                Err(e) => return Err(e),
            }
        }

        if token.is_valid() {
            Ok(token)
        } else {
            Err(AuthError::TokenExpired)
        }
    }

    pub async fn refresh_token(&self, token: &TokenInfo) -> Result<TokenInfo, AuthError> {
        let refresh_token = token.refresh_token.as_ref().ok_or(AuthError::NoRefreshToken)?;

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self.client.post(&self.token_endpoint).form(&params).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AuthError::OAuthError(error_text));
        }

        let token_response: TokenResponse = response.json().await?;

        let new_token = TokenInfo::new(token_response.access_token, token_response.expires_in)
            .with_refresh_token(token_response.refresh_token.unwrap_or_else(|| refresh_token.clone()));

        self.storage.save_token(&new_token)?;
        tracing::info!("Refreshed access token, valid until {}", new_token.expires_at);

        Ok(new_token)
    }
}
