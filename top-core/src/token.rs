use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::keys::{SigningKeyPair, KEY_ID, SIGNING_ALGORITHM};

/// Scope granted to every issued token.
pub const TOKEN_SCOPE: &str = "openid profile email";

/// Claims carried by an issued access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub jti: String,
    pub iss: String,
    pub sub: String,
    pub client_id: String,
    pub scope: String,
    pub aud: Vec<String>,
    pub iat: u64,
    pub exp: u64,
}

/// Service for signing and verifying access tokens with the provider key.
pub(crate) struct TokenService {
    key_pair: Arc<SigningKeyPair>,
    issuer: String,
    client_id: String,
}

impl TokenService {
    pub fn new(key_pair: Arc<SigningKeyPair>, issuer: String, client_id: String) -> Self {
        Self {
            key_pair,
            issuer,
            client_id,
        }
    }

    /// Sign a token for `sub` with serial number `serial`, valid for `ttl_secs`.
    ///
    /// Fractional lifetimes are rounded up so that `exp - iat` stays a
    /// positive number of whole seconds.
    pub fn issue_token(
        &self,
        serial: u64,
        sub: &str,
        ttl_secs: f64,
    ) -> Result<String, ProviderError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ProviderError::Internal(format!("system clock error: {e}")))?
            .as_secs();

        // The cast saturates; the sum must not wrap.
        let exp = now.checked_add(ttl_secs.ceil() as u64).ok_or_else(|| {
            ProviderError::InvalidInput("The expiration time is invalid.".into())
        })?;

        let claims = AccessTokenClaims {
            jti: format!("test-{serial}"),
            iss: self.issuer.clone(),
            sub: sub.to_string(),
            client_id: self.client_id.clone(),
            scope: TOKEN_SCOPE.to_string(),
            aud: vec![self.client_id.clone()],
            iat: now,
            exp,
        };

        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(KEY_ID.to_string());

        encode(&header, &claims, self.key_pair.encoding_key())
            .map_err(|e| ProviderError::Internal(format!("failed to sign JWT: {e}")))
    }

    /// Verify signature, issuer, audience and expiry, returning the raw claims.
    pub fn verify_token(&self, token: &str) -> Result<serde_json::Value, ProviderError> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.client_id]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let data = decode::<serde_json::Value>(token, self.key_pair.decoding_key(), &validation)
            .map_err(|e| {
                warn!(error = %e, "Token verification failed");
                ProviderError::NotFound("token is invalid or expired".into())
            })?;

        debug!(jti = ?data.claims.get("jti"), "Token verified");
        Ok(data.claims)
    }
}
