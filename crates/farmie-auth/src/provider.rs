//! Read-only access to the session token.
//!
//! Clients ask a [`TokenProvider`] for the bearer token right before building an
//! authenticated request; a missing, blank or expired token surfaces as
//! [`FarmieError::Unauthenticated`] so no request is sent.

use farmie_core::FarmieError;

use crate::storage::{SecureStorage, TokenSet};

pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Result<String, FarmieError>;
}

fn usable(token_set: &TokenSet) -> Result<String, FarmieError> {
    if token_set.access_token.trim().is_empty() || token_set.is_expired() {
        return Err(FarmieError::Unauthenticated);
    }
    Ok(token_set.access_token.clone())
}

/// A token held in memory (tests, or a token handed over by the host).
#[derive(Debug, Clone)]
pub struct StaticToken(Option<TokenSet>);

impl StaticToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self(Some(TokenSet::new(access_token)))
    }

    pub fn from_token_set(token_set: TokenSet) -> Self {
        Self(Some(token_set))
    }

    /// No session at all.
    pub fn missing() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Result<String, FarmieError> {
        self.0
            .as_ref()
            .ok_or(FarmieError::Unauthenticated)
            .and_then(usable)
    }
}

/// Reads the token from [`SecureStorage`] on every call, so a login or logout
/// in another part of the app is picked up immediately.
#[derive(Debug, Clone)]
pub struct StoredToken {
    storage: SecureStorage,
    service: String,
}

impl StoredToken {
    pub fn new(storage: SecureStorage, service: impl Into<String>) -> Self {
        Self {
            storage,
            service: service.into(),
        }
    }
}

impl TokenProvider for StoredToken {
    fn bearer_token(&self) -> Result<String, FarmieError> {
        match self.storage.retrieve_token(&self.service) {
            Ok(token_set) => usable(&token_set),
            Err(e) => {
                tracing::debug!("No usable token for {}: {:#}", self.service, e);
                Err(FarmieError::Unauthenticated)
            }
        }
    }
}
