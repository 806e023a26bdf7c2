use axum::extract::{OriginalUri, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Serialize;
use top_core::{AuthorizeRequest, LoginRequest, ProviderError, TokenRequest, UserIdentity};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::forwarded;
use crate::state::AppState;

/// Cache headers required on token responses.
type TokenResponseHeaders = [(header::HeaderName, &'static str); 2];
const TOKEN_HEADERS: TokenResponseHeaders = [
    (header::CACHE_CONTROL, "no-store"),
    (header::PRAGMA, "no-cache"),
];

/// Signing algorithms advertised in the discovery document.
const SIGNING_ALGORITHMS: [&str; 1] = ["ES512"];

const DOCUMENTATION_URL: &str = env!("CARGO_PKG_HOMEPAGE");

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    #[serde(rename = "numUsers")]
    num_users: usize,
}

/// GET /health
pub(crate) async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        num_users: state.provider.num_users(),
    })
}

/// OpenID Connect discovery document.
#[derive(Serialize)]
pub(crate) struct DiscoveryDocument {
    version: &'static str,
    issuer: String,
    jwks_uri: String,
    authorization_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
    scopes_supported: Vec<&'static str>,
    claims_supported: Vec<&'static str>,
    response_types_supported: Vec<&'static str>,
    grant_types_supported: Vec<&'static str>,
    request_object_signing_alg_values_supported: Vec<&'static str>,
    userinfo_signing_alg_values_supported: Vec<&'static str>,
    service_documentation: &'static str,
}

/// GET /.well-known/openid-configuration
///
/// Endpoint URLs follow the URL the client used; the issuer is fixed.
pub(crate) async fn discovery_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Json<DiscoveryDocument> {
    let base = forwarded::base_url(
        &headers,
        uri.path(),
        &state.config.service_url,
        state.config.root_path(),
    );
    debug!(%base, "Serving discovery document");
    Json(DiscoveryDocument {
        version: env!("CARGO_PKG_VERSION"),
        issuer: state.provider.issuer().to_string(),
        jwks_uri: format!("{base}/jwks"),
        authorization_endpoint: format!("{base}/authorize"),
        token_endpoint: format!("{base}/token"),
        userinfo_endpoint: format!("{base}/userinfo"),
        scopes_supported: vec!["openid", "profile", "email"],
        claims_supported: vec!["sub", "name", "email"],
        response_types_supported: vec!["code"],
        grant_types_supported: vec!["authorization_code"],
        request_object_signing_alg_values_supported: SIGNING_ALGORITHMS.to_vec(),
        userinfo_signing_alg_values_supported: SIGNING_ALGORITHMS.to_vec(),
        service_documentation: DOCUMENTATION_URL,
    })
}

/// GET /jwks
pub(crate) async fn jwks_handler(State(state): State<AppState>) -> Response {
    Json(state.provider.jwks()).into_response()
}

/// POST /login
///
/// Returns the raw token as `application/jwt`.
pub(crate) async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.provider.login(&request).map_err(|e| match e {
        ProviderError::InvalidInput(msg) => {
            info!(error = %msg, "Invalid login info");
            ApiError::Unprocessable(msg)
        }
        other => other.into(),
    })?;
    Ok((
        StatusCode::CREATED,
        [(header::CONTENT_TYPE, "application/jwt")],
        token,
    ))
}

/// GET /authorize
///
/// Always redirects unless the redirect URI is unknown.
pub(crate) async fn authorize_handler(
    State(state): State<AppState>,
    Query(request): Query<AuthorizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let location = state.provider.authorize(&request)?;
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]))
}

/// POST /token
pub(crate) async fn token_handler(
    State(state): State<AppState>,
    Form(request): Form<TokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let grant = state.provider.exchange_code(&request)?;
    Ok((TOKEN_HEADERS, Json(grant)))
}

/// GET /userinfo
pub(crate) async fn userinfo_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserIdentity>, ApiError> {
    let token = extract_bearer_token(&headers)?;
    let user = state.provider.user_info(token).map_err(|e| {
        info!("User not found in cache");
        ApiError::from(e)
    })?;
    Ok(Json(user))
}

/// POST /reset
pub(crate) async fn reset_handler(State(state): State<AppState>) -> StatusCode {
    state.provider.reset().await;
    StatusCode::NO_CONTENT
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Forbidden("Not authenticated".into()))?;

    auth.strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Forbidden("Not authenticated".into()))
}
