use std::sync::Arc;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::OidcProviderConfig;
use crate::error::ProviderError;
use crate::expiry::ExpiryScheduler;
use crate::identity::{op_domain, IdentitySynthesizer, LoginRequest, UserIdentity};
use crate::keys::{Jwks, SigningKeyPair};
use crate::store::TokenStore;
use crate::token::{TokenService, TOKEN_SCOPE};

/// Length of an authorization code.
pub const CODE_LENGTH: usize = 32;

/// Parameters of an authorization request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizeRequest {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state: String,
}

/// Parameters of a token (code exchange) request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: String,
    pub redirect_uri: String,
    pub client_id: String,
}

/// Successful token response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub id_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub scope: String,
}

/// A test OpenID Connect provider.
///
/// Anyone can log in under any name. Tokens are signed with a key generated
/// at construction and stay valid until they expire or the provider is reset.
pub struct OidcProvider {
    config: OidcProviderConfig,
    issuer: String,
    op_domain: String,
    key_pair: Arc<SigningKeyPair>,
    token_service: TokenService,
    identities: IdentitySynthesizer,
    store: Arc<TokenStore>,
    expiry: ExpiryScheduler,
}

impl OidcProvider {
    /// Validate the configuration and generate the signing key.
    pub fn new(config: OidcProviderConfig) -> Result<Self, ProviderError> {
        config.validate()?;
        let issuer = config.normalized_issuer().to_string();
        let op_domain = op_domain(&issuer);
        Url::parse(&config.redirect_url).map_err(|e| {
            ProviderError::Config(format!("Invalid redirect URL {:?}: {e}", config.redirect_url))
        })?;

        let key_pair = Arc::new(SigningKeyPair::generate()?);
        let token_service =
            TokenService::new(key_pair.clone(), issuer.clone(), config.client_id.clone());
        let identities = IdentitySynthesizer::new(config.user_domain.clone(), op_domain.clone());
        let store = Arc::new(TokenStore::new());
        let expiry = ExpiryScheduler::new(store.clone());

        info!(%issuer, client_id = %config.client_id, "Test OpenID Connect provider created");

        Ok(Self {
            config,
            issuer,
            op_domain,
            key_pair,
            token_service,
            identities,
            store,
            expiry,
        })
    }

    /// Log in as a user and return a fresh access token.
    ///
    /// Subject and e-mail are derived from the name unless given.
    pub fn login(&self, request: &LoginRequest) -> Result<String, ProviderError> {
        debug!(name = %request.name, "Logging in");

        let ttl = match request.valid_seconds {
            None => Duration::from_secs(self.config.valid_seconds),
            Some(secs) if secs > 0.0 => Duration::try_from_secs_f64(secs)
                .map_err(|_| ProviderError::InvalidInput("The expiration time is invalid.".into()))?,
            Some(_) => {
                return Err(ProviderError::InvalidInput(
                    "The expiration time is invalid.".into(),
                ))
            }
        };

        let user = self.identities.synthesize(request)?;
        let sub = user.sub.clone();
        let ttl_secs = ttl.as_secs_f64();

        let token = self.store.record_token(user, |serial| {
            self.token_service.issue_token(serial, &sub, ttl_secs)
        })?;

        if let Err(e) = self.expiry.schedule(token.clone(), ttl) {
            self.store.expire(&token);
            return Err(e);
        }

        info!(%sub, ttl_secs, "User logged in");
        debug!(%token, "Created login token");
        Ok(token)
    }

    /// Handle an authorization request, returning the URL to redirect to.
    ///
    /// Only an unknown redirect URI is an error; every other failure is
    /// reported to the client through the redirect.
    pub fn authorize(&self, request: &AuthorizeRequest) -> Result<String, ProviderError> {
        debug!(client_id = %request.client_id, "Authorization request");

        if request.redirect_uri != self.config.redirect_url {
            warn!(redirect_uri = %request.redirect_uri, "Unknown redirect URI");
            return Err(ProviderError::InvalidInput("Invalid redirect URI".into()));
        }

        let state = request.state.as_str();
        if request.response_type != "code" {
            return Ok(self.error_redirect(
                "invalid_response_type",
                "Only the authorization code flow is supported",
                state,
            ));
        }
        if !request.scope.split_whitespace().any(|s| s == "openid") {
            return Ok(self.error_redirect(
                "invalid_scope",
                "The scope must include openid",
                state,
            ));
        }
        if state.is_empty() {
            return Ok(self.error_redirect("missing_state", "The state is missing", state));
        }
        if request.client_id != self.config.client_id {
            return Ok(self.error_redirect(
                "unauthorized_client",
                "The client ID is unknown",
                state,
            ));
        }

        let Some(token) = self.store.last_issued() else {
            return Ok(self.error_redirect("login_required", "User did not log in", state));
        };

        let code = generate_code();
        if let Err(e) = self.store.bind_code(code.clone(), &token) {
            // The token expired between selection and binding.
            debug!(error = %e, "Selected token is gone");
            return Ok(self.error_redirect("login_required", "User did not log in", state));
        }

        info!(client_id = %request.client_id, "Authorization code issued");
        Ok(self.redirect_with(&[("code", code.as_str()), ("state", state)]))
    }

    /// Redeem an authorization code for the token it is bound to.
    ///
    /// A code can be redeemed only once.
    pub fn exchange_code(&self, request: &TokenRequest) -> Result<TokenGrant, ProviderError> {
        debug!(client_id = %request.client_id, "Token request");

        if request.grant_type != "authorization_code" {
            return Err(ProviderError::InvalidInput(format!(
                "Unsupported grant type: {:?}",
                request.grant_type
            )));
        }
        if request.client_id != self.config.client_id {
            return Err(ProviderError::InvalidInput("Invalid client ID".into()));
        }
        if request.redirect_uri != self.config.redirect_url {
            return Err(ProviderError::InvalidInput("Invalid redirect URI".into()));
        }

        let token = self.store.exchange_code(&request.code).map_err(|e| {
            warn!("Authorization code is invalid or expired");
            e
        })?;

        info!(client_id = %request.client_id, "Authorization code redeemed");
        Ok(TokenGrant {
            access_token: token.clone(),
            id_token: token,
            token_type: "Bearer".into(),
            expires_in: self.config.valid_seconds,
            scope: TOKEN_SCOPE.into(),
        })
    }

    /// The identity associated with the given access token.
    pub fn user_info(&self, token: &str) -> Result<UserIdentity, ProviderError> {
        self.store.lookup_user(token)
    }

    /// Decode the given token, verifying it with the provider key.
    pub fn decode_and_validate_token(
        &self,
        token: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        self.token_service.verify_token(token)
    }

    /// Cancel all expiry jobs and forget every token and code.
    pub async fn reset(&self) {
        self.expiry.cancel_all().await;
        self.store.clear_all();
        info!("Provider reset");
    }

    /// The public key set.
    pub fn jwks(&self) -> Jwks<'_> {
        self.key_pair.jwks()
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn op_domain(&self) -> &str {
        &self.op_domain
    }

    pub fn user_domain(&self) -> &str {
        &self.config.user_domain
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub fn redirect_url(&self) -> &str {
        &self.config.redirect_url
    }

    pub fn valid_seconds(&self) -> u64 {
        self.config.valid_seconds
    }

    /// Number of tokens currently known.
    pub fn num_users(&self) -> usize {
        self.store.len()
    }

    /// Number of authorization codes not yet redeemed.
    pub fn num_codes(&self) -> usize {
        self.store.num_codes()
    }

    /// Number of expiry jobs still outstanding.
    pub fn num_jobs(&self) -> usize {
        self.expiry.len()
    }

    /// The `jti` the next login will get.
    pub fn next_jti(&self) -> String {
        format!("test-{}", self.store.next_serial())
    }

    fn error_redirect(&self, error: &str, description: &str, state: &str) -> String {
        warn!(error, "Authorization request rejected");
        let mut params = vec![("error", error), ("error_description", description)];
        if !state.is_empty() {
            params.push(("state", state));
        }
        self.redirect_with(&params)
    }

    /// Append `params` to the configured redirect URL as given, without
    /// normalizing it.
    fn redirect_with(&self, params: &[(&str, &str)]) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        let redirect_url = &self.config.redirect_url;
        let separator = if redirect_url.contains('?') { '&' } else { '?' };
        format!("{redirect_url}{separator}{query}")
    }
}

fn generate_code() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}
