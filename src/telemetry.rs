//! Log setup. `LOG_LEVEL` takes a bare level or full directives such as
//! "info,dispatch=debug,catalog=debug"; `LOG_FORMAT` is `pretty` (default),
//! `compact` or `json`.
//!
//! API keys never reach a log line; call sites record `has_key` only.

use tracing_subscriber::EnvFilter;

/// Our own targets at debug; request spans come from the HTTP trace layer.
const DEFAULT_FILTER: &str = "info,qgen_ui=debug,dispatch=debug,catalog=info,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Unparseable directives fall back to the default filter.
fn filter_from(raw: Option<&str>) -> EnvFilter {
    raw.filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok();
    let format = std::env::var("LOG_FORMAT").ok();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_from(level.as_deref()))
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match LogFormat::parse(format.as_deref()) {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.init(),
    }
}
