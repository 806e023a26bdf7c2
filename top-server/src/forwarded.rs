//! Reconstruction of the URL a client used to reach the service, possibly
//! through a reverse proxy.

use axum::http::HeaderMap;

/// Path of the discovery document relative to the API root.
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

const PATH_HEADERS: [&str; 2] = ["x-forwarded-path", "x-envoy-original-path"];
const PROTO_HEADERS: [&str; 2] = ["x-forwarded-proto", "x-envoy-original-proto"];
const HOST_HEADERS: [&str; 3] = ["x-forwarded-host", "x-envoy-original-host", "host"];

/// The URL of the current request as seen by the client, without query.
///
/// Proxy headers win when a forwarded path is present. Otherwise the URL is
/// built from the `Host` header and `request_path`. Returns `None` when no
/// host is known.
pub fn original_url(headers: &HeaderMap, request_path: &str) -> Option<String> {
    if let Some(path) = first_header(headers, &PATH_HEADERS) {
        let scheme = first_header(headers, &PROTO_HEADERS).unwrap_or("http");
        let host = first_header(headers, &HOST_HEADERS)?;
        return Some(format!("{scheme}://{host}{}", strip_query(path)));
    }
    let host = first_header(headers, &["host"])?;
    Some(format!("http://{host}{}", strip_query(request_path)))
}

/// The externally visible base URL of the API, without trailing slash.
///
/// Derived from the URL of a discovery request by dropping the discovery
/// path. Falls back to `service_url` joined with `root_path`.
pub fn base_url(
    headers: &HeaderMap,
    request_path: &str,
    service_url: &str,
    root_path: &str,
) -> String {
    match original_url(headers, request_path) {
        Some(url) => {
            let url = url.strip_suffix(DISCOVERY_PATH).unwrap_or(&url);
            url.trim_end_matches('/').to_string()
        }
        None => format!("{}{}", service_url.trim_end_matches('/'), root_path),
    }
}

fn first_header<'a>(headers: &'a HeaderMap, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    })
}

fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(path, _)| path)
}
