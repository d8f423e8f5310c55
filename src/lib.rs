pub mod app;
pub mod auth;
pub mod chatbot;
pub mod clock;
pub mod config;
pub mod mail;
pub mod state;
pub mod test_utils;

/// Installs the tracing subscriber: `RUST_LOG` filter, JSON when `LOG_FORMAT=json`.
pub fn init_tracing(default_filter: &str) {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}
