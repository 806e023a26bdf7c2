//! HTTP surface of the test OpenID Connect provider.
//!
//! Exposes discovery, JWKS, login, authorization, token, userinfo, health
//! and reset endpoints on top of [`top_core::OidcProvider`].

pub mod config;
pub mod error;
pub mod forwarded;
pub mod handlers;
pub mod layers;
pub mod logging;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use top_core::{OidcProvider, ProviderError};
use tracing::info;

pub use config::{ConfigError, LogFormat, ServiceConfig};
pub use error::ApiError;
pub use state::AppState;

/// Errors that stop the service.
#[derive(Debug)]
pub enum ServerError {
    Config(ConfigError),
    Provider(ProviderError),
    Bind { addr: String, source: std::io::Error },
    Io(std::io::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "{e}"),
            ServerError::Provider(e) => write!(f, "Cannot create provider: {e}"),
            ServerError::Bind { addr, source } => write!(f, "Cannot bind {addr}: {source}"),
            ServerError::Io(e) => write!(f, "Server error: {e}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Config(e) => Some(e),
            ServerError::Provider(e) => Some(e),
            ServerError::Bind { source, .. } => Some(source),
            ServerError::Io(e) => Some(e),
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> Self {
        ServerError::Config(e)
    }
}

impl From<ProviderError> for ServerError {
    fn from(e: ProviderError) -> Self {
        ServerError::Provider(e)
    }
}

/// Build the application router, mounted under the configured root path.
pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            forwarded::DISCOVERY_PATH,
            get(handlers::discovery_handler),
        )
        .route("/jwks", get(handlers::jwks_handler))
        .route("/login", post(handlers::login_handler))
        .route("/authorize", get(handlers::authorize_handler))
        .route("/token", post(handlers::token_handler))
        .route("/userinfo", get(handlers::userinfo_handler))
        .route("/reset", post(handlers::reset_handler));

    let root = state.config.root_path().to_string();
    let cors = layers::cors(&state.config.cors_allowed_origins);
    let routes = routes.with_state(state);
    let app = if root.is_empty() {
        routes
    } else {
        Router::new().nest(&root, routes)
    };

    app.layer(layers::catch_panic())
        .layer(cors)
        .layer(layers::trace())
}

/// Create the provider and serve until a shutdown signal arrives.
pub async fn serve(config: ServiceConfig) -> Result<(), ServerError> {
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve_with(listener, config, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` completes.
///
/// Outstanding expiry jobs are cancelled before returning.
pub async fn serve_with<F>(
    listener: TcpListener,
    config: ServiceConfig,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let provider = Arc::new(OidcProvider::new(config.provider.clone())?);
    let app = router(AppState::new(provider.clone(), config));

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Test OpenID Connect provider listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Io)?;

    provider.reset().await;
    info!("Test OpenID Connect provider stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl-C or SIGTERM on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
