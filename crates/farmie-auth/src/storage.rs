use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Session token issued by the backend's `/login` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer token for API requests
    pub access_token: String,

    /// Token expiration timestamp (Unix timestamp), if the issuer reported one
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl TokenSet {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// Check if the token is expired. Tokens without an expiry never expire locally.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => chrono::Utc::now().timestamp() >= expires_at,
            None => false,
        }
    }
}

/// File-based token storage rooted in the user's config directory
#[derive(Debug, Clone)]
pub struct SecureStorage {
    root: PathBuf,
}

impl SecureStorage {
    /// Storage under `<config_dir>/farmie/tokens`
    pub fn default_location() -> Result<Self> {
        let root = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("farmie")
            .join("tokens");
        Ok(Self { root })
    }

    /// Storage rooted at an explicit directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn token_path(&self, service: &str) -> PathBuf {
        self.root.join(format!("{}.json", service))
    }

    /// Store a token set
    pub fn store_token(&self, service: &str, token_set: &TokenSet) -> Result<()> {
        fs::create_dir_all(&self.root).context("Failed to create tokens directory")?;

        let path = self.token_path(service);
        let json =
            serde_json::to_string_pretty(token_set).context("Failed to serialize token set")?;

        fs::write(&path, &json).context("Failed to write token file")?;

        tracing::info!("Stored token for service: {} at {:?}", service, path);
        Ok(())
    }

    /// Retrieve a token set
    pub fn retrieve_token(&self, service: &str) -> Result<TokenSet> {
        let path = self.token_path(service);

        let json = fs::read_to_string(&path).context("Failed to read token file")?;

        let token_set: TokenSet =
            serde_json::from_str(&json).context("Failed to deserialize token set")?;

        tracing::debug!("Retrieved token for service: {}", service);
        Ok(token_set)
    }

    /// Delete a token set (logout)
    pub fn delete_token(&self, service: &str) -> Result<()> {
        let path = self.token_path(service);

        if path.exists() {
            fs::remove_file(&path).context("Failed to delete token file")?;
            tracing::info!("Deleted token for service: {}", service);
        }

        Ok(())
    }

    pub fn has_token(&self, service: &str) -> bool {
        self.retrieve_token(service).is_ok()
    }
}
