//! Service-account key loading

use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use std::{fmt, io, path::{Path, PathBuf}};
use thiserror::Error;
use tracing::debug;

/// Default OAuth2 token endpoint for Google service accounts
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Failure to load a service-account key. Always fatal at startup.
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("key file {} does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read key file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("key file {} is not valid service-account JSON: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("key file {} has type '{found}', expected 'service_account'", .path.display())]
    WrongType { path: PathBuf, found: String },

    #[error("key file {} contains an unusable private key: {source}", .path.display())]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

impl CredentialsError {
    /// Path of the key file that failed to load
    pub fn path(&self) -> &Path {
        match self {
            CredentialsError::NotFound { path }
            | CredentialsError::Unreadable { path, .. }
            | CredentialsError::Malformed { path, .. }
            | CredentialsError::WrongType { path, .. }
            | CredentialsError::InvalidKey { path, .. } => path,
        }
    }

    /// The static message shown to the user when startup halts
    pub fn user_message(&self) -> String {
        format!(
            "❌ Auth Error: Could not load '{}'. Make sure it is in this folder.",
            self.path().display()
        )
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// A Google service-account JSON key
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: Option<String>,
    pub project_id: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Read and check a key file
    pub async fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        debug!("Loading service-account key from: {}", path.display());

        let content = tokio::fs::read_to_string(path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CredentialsError::NotFound { path: path.to_path_buf() }
            } else {
                CredentialsError::Unreadable { path: path.to_path_buf(), source }
            }
        })?;

        Self::from_json(path, &content)
    }

    /// Parse key JSON; `path` is only used for error reporting
    pub fn from_json(path: &Path, content: &str) -> Result<Self, CredentialsError> {
        let key: Self = serde_json::from_str(content).map_err(|source| CredentialsError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(found) = key.key_type.as_deref() {
            if found != "service_account" {
                return Err(CredentialsError::WrongType {
                    path: path.to_path_buf(),
                    found: found.to_string(),
                });
            }
        }

        key.encoding_key().map_err(|source| CredentialsError::InvalidKey {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(key)
    }

    /// RSA signing key for JWT assertions
    pub fn encoding_key(&self) -> Result<EncodingKey, jsonwebtoken::errors::Error> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes())
    }
}
