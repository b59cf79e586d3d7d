/// Initialize tracing/logging for the application.
///
/// `default_level` is matched case-insensitively; anything unrecognised
/// falls back to `info`.
pub fn init(default_level: &str) {
    let lvl = parse_level(default_level);

    // try_init so tests and embedders can call this more than once
    let _ = tracing_subscriber::fmt()
        .with_max_level(lvl)
        .with_target(false)
        .try_init();
}

pub(crate) fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}
