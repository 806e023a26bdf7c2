//! Authorization-state engine of the test OpenID Connect provider.
//!
//! Issues signed access tokens for arbitrary named users, implements the
//! authorization-code grant on top of them, and expires tokens after a
//! configurable lifetime. Nothing is persisted.
//!
//! # Example
//!
//! ```ignore
//! use top_core::{LoginRequest, OidcProvider, OidcProviderConfig};
//!
//! let provider = OidcProvider::new(OidcProviderConfig::default())?;
//! let token = provider.login(&LoginRequest::new("John Doe"))?;
//! let user = provider.user_info(&token)?;
//! assert_eq!(user.email, "john.doe@home.org");
//! provider.reset().await;
//! ```

pub mod config;
pub mod error;
pub mod expiry;
pub mod identity;
pub mod keys;
pub mod provider;
pub mod store;
pub mod token;

pub use config::OidcProviderConfig;
pub use error::ProviderError;
pub use identity::{IdentitySynthesizer, LoginRequest, UserIdentity};
pub use keys::{Jwk, Jwks, SigningKeyPair};
pub use provider::{AuthorizeRequest, OidcProvider, TokenGrant, TokenRequest, CODE_LENGTH};
pub use token::{AccessTokenClaims, TOKEN_SCOPE};

pub mod prelude {
    //! Re-exports of the most commonly used provider types.
    pub use crate::{
        AuthorizeRequest, LoginRequest, OidcProvider, OidcProviderConfig, ProviderError,
        TokenRequest, UserIdentity,
    };
}
