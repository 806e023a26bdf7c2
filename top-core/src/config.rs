use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Configuration for the test OpenID Connect provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcProviderConfig {
    /// Issuer URL asserted in the `iss` claim and the discovery document.
    pub issuer: String,
    /// Domain of the home organization of the test users (used for e-mails).
    pub user_domain: String,
    /// The single client ID this provider knows.
    pub client_id: String,
    /// The single redirect URL accepted by the authorization endpoint.
    pub redirect_url: String,
    /// Default expiration time of access tokens in seconds.
    pub valid_seconds: u64,
}

impl Default for OidcProviderConfig {
    fn default() -> Self {
        Self {
            issuer: "https://op.test".into(),
            user_domain: "home.org".into(),
            client_id: "test-client".into(),
            redirect_url: "https://data.test/oauth/callback".into(),
            valid_seconds: 60 * 60,
        }
    }
}

impl OidcProviderConfig {
    /// Set the issuer URL.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set the e-mail domain of the test users.
    pub fn user_domain(mut self, domain: impl Into<String>) -> Self {
        self.user_domain = domain.into();
        self
    }

    /// Set the client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the redirect URL.
    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = url.into();
        self
    }

    /// Set the default token time-to-live in seconds.
    pub fn valid_seconds(mut self, secs: u64) -> Self {
        self.valid_seconds = secs;
        self
    }

    /// The issuer with any trailing slash removed.
    pub fn normalized_issuer(&self) -> &str {
        self.issuer.trim_end_matches('/')
    }

    /// Check the configuration, failing on values the provider cannot work with.
    pub fn validate(&self) -> Result<(), ProviderError> {
        let issuer = self.normalized_issuer();
        if issuer.is_empty() || !issuer.contains("://") || !issuer.contains('.') {
            return Err(ProviderError::Config(format!("Invalid issuer: {issuer:?}")));
        }
        let domain = &self.user_domain;
        if domain.is_empty() || domain.contains("://") || !domain.contains('.') {
            return Err(ProviderError::Config(format!(
                "Invalid user domain: {domain:?}"
            )));
        }
        if self.client_id.trim().is_empty() {
            return Err(ProviderError::Config("Client ID must not be empty".into()));
        }
        if self.redirect_url.trim().is_empty() {
            return Err(ProviderError::Config("Redirect URL must not be empty".into()));
        }
        if self.valid_seconds == 0 {
            return Err(ProviderError::Config(
                "Default expiration time must be positive".into(),
            ));
        }
        Ok(())
    }
}
