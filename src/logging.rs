//! Logging setup via tracing-subscriber
//!
//! `RUST_LOG` overrides the level. Without it, production logs at `info`
//! as JSON and everything else logs at `debug` as text.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init(production: bool) {
    let default_level = if production { "info" } else { "debug" };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if production {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .init();
    } else {
        fmt().with_env_filter(filter).with_target(true).init();
    }
}
