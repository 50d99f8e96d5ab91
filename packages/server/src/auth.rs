//! Handshake credential verification.
//!
//! Token issuance lives in the authentication service upstream; this layer
//! only checks the bearer credential presented at connect time and rejects
//! the handshake before any presence action is accepted.

use thiserror::Error;

/// Handshake verification failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Empty bearer token
    #[error("Bearer token is missing")]
    MissingToken,

    /// Token did not verify
    #[error("Bearer token rejected")]
    InvalidToken,
}

/// Verifies the bearer credential presented at the WebSocket handshake.
pub trait TokenVerifier: Send + Sync {
    /// Verify a bearer token. Returns `Ok(())` when the handshake may proceed.
    fn verify(&self, token: &str) -> Result<(), AuthError>;
}

/// Shared-secret verifier.
///
/// Accepts exactly the token configured at startup. The upstream auth
/// service hands the same secret to clients it has already authenticated.
pub struct StaticTokenVerifier {
    secret: String,
}

impl StaticTokenVerifier {
    /// Create a verifier over the configured shared secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        if token != self.secret {
            return Err(AuthError::InvalidToken);
        }
        Ok(())
    }
}
