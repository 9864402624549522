//! Google OAuth2 token management
//!
//! Two credential flows are supported, selected by the config:
//! - OAuth2 refresh token (`client_id` / `client_secret` / `refresh_token`)
//! - Service account (`client_email` / `private_key`), exchanged for an
//!   access token via an RS256 JWT-bearer assertion
//!
//! Tokens are cached until shortly before expiry and refreshed behind a
//! write lock so concurrent callers trigger a single refresh.

use crate::config::{AuthMethod, Config};
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Google's OAuth2 token endpoint
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth2 scope for read-only Analytics access
const ANALYTICS_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";

/// Seconds of leeway before expiry at which a token is considered stale
const EXPIRY_LEEWAY_SECONDS: i64 = 60;

/// Credentials for one of the supported flows
#[derive(Debug, Clone)]
pub enum Credentials {
    /// OAuth2 refresh-token flow
    Oauth2 {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
    /// Service-account JWT-bearer flow
    ServiceAccount {
        client_email: String,
        private_key: String,
    },
}

impl Credentials {
    /// Build credentials from a validated config
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.auth_method() {
            AuthMethod::Oauth2 => Ok(Self::Oauth2 {
                client_id: config
                    .client_id
                    .clone()
                    .ok_or_else(|| Error::missing_field("client_id"))?,
                client_secret: config
                    .client_secret
                    .clone()
                    .ok_or_else(|| Error::missing_field("client_secret"))?,
                refresh_token: config
                    .refresh_token
                    .clone()
                    .ok_or_else(|| Error::missing_field("refresh_token"))?,
            }),
            AuthMethod::ServiceAccount => Ok(Self::ServiceAccount {
                client_email: config
                    .client_email
                    .clone()
                    .ok_or_else(|| Error::missing_field("client_email"))?,
                private_key: config
                    .private_key
                    .clone()
                    .ok_or_else(|| Error::missing_field("private_key"))?,
            }),
        }
    }
}

/// A cached access token with its expiry
#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_LEEWAY_SECONDS) >= self.expires_at
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Claims for the service-account assertion
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

/// Authenticator handles fetching and caching access tokens
pub struct Authenticator {
    credentials: Credentials,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    http_client: reqwest::Client,
    token_url: String,
}

impl Authenticator {
    /// Create a new authenticator with the given credentials
    pub fn new(credentials: Credentials, http_client: reqwest::Client) -> Self {
        Self {
            credentials,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Override the token endpoint (tests)
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Get a valid bearer token, refreshing if necessary
    pub async fn access_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;

        // Double-check after acquiring the write lock (another task might
        // have refreshed while we waited)
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        info!("Refreshing access token");
        let token = self.fetch_token().await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        let payload = self.token_request_payload()?;

        let response = self
            .http_client
            .post(&self.token_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenRefresh {
                message: format!("token endpoint returned {status}: {body}"),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| Error::TokenRefresh {
            message: format!("invalid token response: {e}"),
        })?;

        Ok(CachedToken {
            token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }

    fn token_request_payload(&self) -> Result<serde_json::Value> {
        match &self.credentials {
            Credentials::Oauth2 {
                client_id,
                client_secret,
                refresh_token,
            } => Ok(serde_json::json!({
                "refresh_token": refresh_token,
                "client_id": client_id,
                "client_secret": client_secret,
                "grant_type": "refresh_token",
            })),
            Credentials::ServiceAccount {
                client_email,
                private_key,
            } => {
                let now = Utc::now();
                let claims = AssertionClaims {
                    iss: client_email,
                    scope: ANALYTICS_SCOPE,
                    aud: TOKEN_URL,
                    exp: (now + Duration::hours(1)).timestamp(),
                    iat: now.timestamp(),
                };
                let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
                    Error::JwtGeneration {
                        message: format!("invalid private key: {e}"),
                    }
                })?;
                let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
                    .map_err(|e| Error::JwtGeneration {
                        message: e.to_string(),
                    })?;
                Ok(serde_json::json!({
                    "grant_type": "urn:ietf:params:oauth:grant-type:jwt-bearer",
                    "assertion": assertion,
                }))
            }
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oauth2_credentials() -> Credentials {
        Credentials::Oauth2 {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    #[tokio::test]
    async fn test_oauth2_token_fetch_and_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_partial_json(serde_json::json!({
                "grant_type": "refresh_token",
                "refresh_token": "refresh",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "token-1",
                "expires_in": 3600,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = Authenticator::new(oauth2_credentials(), reqwest::Client::new())
            .with_token_url(format!("{}/token", server.uri()));

        assert_eq!(auth.access_token().await.unwrap(), "token-1");
        // Second call is served from cache; the mock expects exactly one hit
        assert_eq!(auth.access_token().await.unwrap(), "token-1");
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "short-lived",
                "expires_in": 1,
            })))
            .expect(2)
            .mount(&server)
            .await;

        let auth = Authenticator::new(oauth2_credentials(), reqwest::Client::new())
            .with_token_url(format!("{}/token", server.uri()));

        // expires_in of 1s is inside the expiry leeway, so every call refreshes
        assert_eq!(auth.access_token().await.unwrap(), "short-lived");
        assert_eq!(auth.access_token().await.unwrap(), "short-lived");
    }

    #[tokio::test]
    async fn test_token_endpoint_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let auth = Authenticator::new(oauth2_credentials(), reqwest::Client::new())
            .with_token_url(format!("{}/token", server.uri()));

        let err = auth.access_token().await.unwrap_err();
        assert!(err.to_string().contains("Token refresh failed"));
    }

    #[tokio::test]
    async fn test_bad_private_key_is_rejected() {
        let auth = Authenticator::new(
            Credentials::ServiceAccount {
                client_email: "svc@example.iam.gserviceaccount.com".to_string(),
                private_key: "not a pem".to_string(),
            },
            reqwest::Client::new(),
        );

        let err = auth.access_token().await.unwrap_err();
        assert!(err.to_string().contains("JWT assertion failed"));
    }
}
