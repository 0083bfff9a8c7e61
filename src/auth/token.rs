//! OAuth2 JWT-bearer token exchange for service accounts

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use super::{AccessTokenProvider, ServiceAccountKey};

/// Scope needed for Vertex AI
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Tokens this close to expiry are treated as expired
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Lifetime requested for each JWT assertion
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("failed to sign JWT assertion: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("token request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Mints and caches access tokens from a service-account key
#[derive(Debug, Clone)]
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    http_client: Client,
    scopes: Vec<String>,
    cached: Arc<Mutex<Option<CachedToken>>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, http_client: Client) -> Self {
        Self {
            key,
            http_client,
            scopes: vec![CLOUD_PLATFORM_SCOPE.to_string()],
            cached: Arc::new(Mutex::new(None)),
        }
    }

    fn build_jwt(&self, now: DateTime<Utc>) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let scope = self.scopes.join(" ");
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &scope,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let encoding_key = self.key.encoding_key()?;
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)?)
    }

    async fn fetch_token(&self, jwt: String) -> Result<CachedToken, TokenError> {
        let url = &self.key.token_uri;
        debug!("Exchanging JWT assertion at {}", url);

        let response = self
            .http_client
            .post(url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|source| TokenError::Request { url: url.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Rejected { status: status.as_u16(), body });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|source| TokenError::Request { url: url.clone(), source })?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, TokenError> {
        let now = Utc::now();
        {
            let cache = self.cached.lock().await;
            if let Some(token) = cache.as_ref().filter(|t| t.is_fresh(now)) {
                return Ok(token.access_token.clone());
            }
        }

        let jwt = self.build_jwt(now)?;
        let token = self.fetch_token(jwt).await?;

        let mut cache = self.cached.lock().await;
        *cache = Some(token.clone());
        Ok(token.access_token)
    }
}
