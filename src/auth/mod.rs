//! Service-account credentials and OAuth2 access tokens
//!
//! The key file is loaded once at startup; a failure there is fatal. Access
//! tokens are minted lazily per request and cached until shortly before expiry.

mod credentials;
mod token;

pub use credentials::*;
pub use token::*;

use async_trait::async_trait;

/// Source of bearer tokens for API requests
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return a valid access token, minting a new one if needed
    async fn access_token(&self) -> Result<String, TokenError>;
}

#[cfg(test)]
pub(crate) const TEST_KEY_JSON: &str = include_str!("../../testdata/service-account.json");

/// Fixed token, for driving the model client in tests
#[cfg(test)]
pub(crate) struct StaticToken(pub &'static str);

#[cfg(test)]
#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, TokenError> {
        Ok(self.0.to_string())
    }
}
