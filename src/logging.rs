use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "FILE_ORGANIZER_LOG";

pub fn init_logger() {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());

    // stdout carries the JSON summary, so logs go to stderr.
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(EnvFilter::new(filter))
        .try_init();
}
