use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Academic titles that are removed from the front of a login name.
const TITLES: &[&str] = &["Dr.", "Prof."];

/// The identity of a logged-in test user, as returned by the userinfo endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Subject identifier.
    pub sub: String,
    /// E-mail address of the user.
    pub email: String,
    /// Full name of the user.
    pub name: String,
}

/// Data used to log in as a test user.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// The full name of the user.
    #[garde(skip)]
    pub name: String,
    /// E-mail address, derived from the name if absent.
    #[garde(email)]
    #[serde(default)]
    pub email: Option<String>,
    /// Subject identifier, derived from the name if absent.
    #[garde(skip)]
    #[serde(default)]
    pub sub: Option<String>,
    /// Seconds until the login expires, fractions allowed.
    #[garde(skip)]
    #[serde(default)]
    pub valid_seconds: Option<f64>,
}

impl LoginRequest {
    /// A login request for the given name with everything else derived.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn sub(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    pub fn valid_seconds(mut self, secs: f64) -> Self {
        self.valid_seconds = Some(secs);
        self
    }
}

/// Derives user identities from display names.
#[derive(Clone, Debug)]
pub struct IdentitySynthesizer {
    user_domain: String,
    op_domain: String,
}

impl IdentitySynthesizer {
    pub fn new(user_domain: impl Into<String>, op_domain: impl Into<String>) -> Self {
        Self {
            user_domain: user_domain.into(),
            op_domain: op_domain.into(),
        }
    }

    /// Build the identity for a login request.
    ///
    /// Titles are stripped from the stored name. E-mail and subject are
    /// derived from the stripped name unless given explicitly.
    pub fn synthesize(&self, request: &LoginRequest) -> Result<UserIdentity, ProviderError> {
        request.validate()?;

        let name = strip_title(request.name.trim());
        if name.is_empty() {
            return Err(ProviderError::InvalidInput(
                "The name of the user must be specified.".into(),
            ));
        }
        let lower = name.to_lowercase();

        let email = match request.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => email.to_string(),
            _ => format!("{}@{}", lower.replace(' ', "."), self.user_domain),
        };
        let sub = match request.sub.as_deref().map(str::trim) {
            Some(sub) if !sub.is_empty() => sub.to_string(),
            _ => format!("id-of-{}@{}", lower.replace(' ', "-"), self.op_domain),
        };

        Ok(UserIdentity {
            sub,
            email,
            name: name.to_string(),
        })
    }
}

fn strip_title(name: &str) -> &str {
    TITLES
        .iter()
        .find_map(|title| name.strip_prefix(title))
        .map(str::trim_start)
        .unwrap_or(name)
}

/// Registrable domain (last two labels of the host) of an issuer URL.
pub(crate) fn op_domain(issuer: &str) -> String {
    let host = issuer.split_once("://").map_or(issuer, |(_, rest)| rest);
    let host = host.split('/').next().unwrap_or(host);
    let host = host.rsplit_once(':').map_or(host, |(h, port)| {
        if port.chars().all(|c| c.is_ascii_digit()) {
            h
        } else {
            host
        }
    });
    let mut labels: Vec<&str> = host.rsplit('.').take(2).collect();
    labels.reverse();
    labels.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_domain_keeps_last_two_labels() {
        assert_eq!(op_domain("https://op.test"), "op.test");
        assert_eq!(op_domain("https://proxy.aai.lifescience-ri.eu"), "lifescience-ri.eu");
        assert_eq!(op_domain("https://login.example.org:8443/realms/x"), "example.org");
    }

    #[test]
    fn titles_are_stripped() {
        assert_eq!(strip_title("Dr. Jane Roe"), "Jane Roe");
        assert_eq!(strip_title("Prof.Max Power"), "Max Power");
        assert_eq!(strip_title("Drew Carey"), "Drew Carey");
    }
}
