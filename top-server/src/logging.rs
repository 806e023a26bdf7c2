use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Returns `false` when a
/// subscriber was already installed.
pub fn init_tracing(level: &str, format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{level},tower_http=debug")))
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.is_ok()
}
