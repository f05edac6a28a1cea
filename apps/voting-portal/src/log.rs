//! Logging for the voting portal CLI.
//!
//! Uses the `tracing` library. After calling [`setup`], [`tracing::info!`] and
//! friends print to `stderr`, keeping `stdout` free for command output.
//!
//! You may use the `RUST_LOG` environment variable to configure logging at
//! runtime (see [`EnvFilter`][`tracing_subscriber::EnvFilter`]).

use tracing_subscriber::{prelude::*, util::SubscriberInitExt};

use crate::config::Config;

/// Sets up logging for the application. Call this early in the process
/// lifecycle to ensure logs are not silently ignored.
pub(crate) fn setup(config: &Config) -> color_eyre::Result<()> {
    color_eyre::install()?;
    let stderr_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(std::io::stderr);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(default_directives(config.log_level))
    })?;
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_log)
        .init();
    Ok(())
}

/// Enables `level` for this binary and the workspace crates it drives.
fn default_directives(level: tracing::Level) -> String {
    let app = env!("CARGO_PKG_NAME").replace('-', "_");
    [app.as_str(), "voting_portal_client", "build_config"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}
