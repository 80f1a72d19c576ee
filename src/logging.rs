use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::domain::AVError;

/// Logs to `path`, the terminal belongs to the table. `RUST_LOG` overrides
/// `default_level`.
pub fn init(path: &Path, default_level: &str) -> Result<(), AVError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| AVError::LoggingFailed(e.to_string()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| AVError::LoggingFailed(e.to_string()))
}
