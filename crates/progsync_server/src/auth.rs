//! Authentication support for the sync server.
//!
//! This module provides owner tokens signed with HMAC-SHA256. Tokens
//! include their issue time for expiration checking.
//!
//! ## Token Format
//!
//! `<owner>.<issued>.<signature>` where:
//! - `owner` is the owner id (may itself contain dots)
//! - `issued` is the issue time in Unix millis, decimal
//! - `signature` is the hex HMAC-SHA256 of `<owner>.<issued>`

use crate::error::{ServerError, ServerResult};
use hmac::{Hmac, Mac};
use progsync_model::OwnerId;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key for HMAC.
    pub secret: Vec<u8>,
    /// Token expiration duration.
    pub token_expiry: Duration,
}

impl AuthConfig {
    /// Creates a new auth configuration.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            token_expiry: Duration::from_secs(24 * 60 * 60), // 24 hours
        }
    }

    /// Sets the token expiration duration.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }
}

/// Issues and checks owner tokens.
#[derive(Clone)]
pub struct TokenValidator {
    config: AuthConfig,
}

impl TokenValidator {
    /// Creates a new token validator.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Creates a token for `owner`, issued now.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Internal`] if the secret cannot key the MAC.
    pub fn create_token(&self, owner: &OwnerId) -> ServerResult<String> {
        self.create_token_at(owner, now_millis())
    }

    fn create_token_at(&self, owner: &OwnerId, issued: u64) -> ServerResult<String> {
        let payload = format!("{}.{}", owner.as_str(), issued);
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Validates a token and returns the owner it was issued to.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotAuthorized`] if the token is malformed,
    /// the signature does not match or the token has expired.
    pub fn validate_token(&self, token: &str) -> ServerResult<OwnerId> {
        let mut parts = token.rsplitn(3, '.');
        let (Some(signature), Some(issued), Some(owner)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(ServerError::NotAuthorized("Malformed token".into()));
        };

        if owner.is_empty() {
            return Err(ServerError::NotAuthorized("Malformed token".into()));
        }
        let issued: u64 = issued
            .parse()
            .map_err(|_| ServerError::NotAuthorized("Malformed token".into()))?;
        let signature = hex::decode(signature)
            .map_err(|_| ServerError::NotAuthorized("Malformed token".into()))?;

        // Constant-time comparison.
        self.mac(&format!("{owner}.{issued}"))?
            .verify_slice(&signature)
            .map_err(|_| ServerError::NotAuthorized("Invalid signature".into()))?;

        let expiry_millis =
            u64::try_from(self.config.token_expiry.as_millis()).unwrap_or(u64::MAX);
        if now_millis() > issued.saturating_add(expiry_millis) {
            return Err(ServerError::NotAuthorized("Token expired".into()));
        }

        Ok(OwnerId::new(owner))
    }

    fn mac(&self, payload: &str) -> ServerResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| ServerError::Internal(format!("invalid auth secret: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}

fn now_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}
