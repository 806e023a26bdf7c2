use std::sync::Arc;

use top_core::OidcProvider;

use crate::config::ServiceConfig;

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<OidcProvider>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(provider: Arc<OidcProvider>, config: ServiceConfig) -> Self {
        Self {
            provider,
            config: Arc::new(config),
        }
    }
}
