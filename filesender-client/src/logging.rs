//! Log output setup

use tracing_subscriber::EnvFilter;

/// Pick the log filter directive
///
/// `--debug` wins, then `RUST_LOG`, then the configured level.
fn filter_directive(configured: &str, debug: bool, env: Option<String>) -> String {
    if debug {
        return "debug".to_string();
    }
    env.filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| configured.to_string())
}

/// Install the global subscriber, writing to stderr
///
/// Does nothing if a subscriber is already installed.
pub fn init(configured: &str, debug: bool) {
    let directive = filter_directive(configured, debug, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
