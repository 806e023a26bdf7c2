/// Errors raised by the test OpenID Connect provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Caller-supplied data failed validation.
    InvalidInput(String),
    /// A token is unknown, either never issued or already expired.
    NotFound(String),
    /// A one-time artifact (authorization code) was reused or never issued.
    InvalidState(String),
    /// The provider configuration is invalid.
    Config(String),
    /// Key generation, signing or clock failure.
    Internal(String),
}

impl ProviderError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::InvalidInput(_) => "invalid_input",
            ProviderError::NotFound(_) => "not_found",
            ProviderError::InvalidState(_) => "invalid_state",
            ProviderError::Config(_) => "config",
            ProviderError::Internal(_) => "internal",
        }
    }

    /// The human-readable message carried by the error.
    pub fn message(&self) -> &str {
        match self {
            ProviderError::InvalidInput(s)
            | ProviderError::NotFound(s)
            | ProviderError::InvalidState(s)
            | ProviderError::Config(s)
            | ProviderError::Internal(s) => s,
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            ProviderError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ProviderError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            ProviderError::Config(msg) => write!(f, "Configuration error: {msg}"),
            ProviderError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<garde::Report> for ProviderError {
    fn from(report: garde::Report) -> Self {
        ProviderError::InvalidInput(report.to_string())
    }
}
