use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. `RUST_LOG` picks the filter (default
/// `info`); `LOGBOX_LOG_JSON=1` switches to flattened JSON lines.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json_requested() {
        fmt()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

fn json_requested() -> bool {
    std::env::var("LOGBOX_LOG_JSON").is_ok_and(|v| v == "1")
}
