//! Tracing subscriber setup: console (pretty or JSON) plus optional file.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::FILE_GUARD;

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init(level: &str, json: bool, logging: &scanpro_config::Logging) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| eyre::eyre!("invalid log level {level:?}: {e}"))?;

    // Console logs go to stderr so stdout stays parseable.
    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(
                Path::new(path),
                logging.rotation.as_deref(),
            )?);
            if let Ok(mut slot) = FILE_GUARD.lock() {
                *slot = Some(guard);
            }
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    Registry::default()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("init tracing: {e}"))
}

fn file_appender(path: &Path, rotation: Option<&str>) -> eyre::Result<RollingFileAppender> {
    let rotation = match rotation.unwrap_or("never") {
        "daily" => Rotation::DAILY,
        "hourly" => Rotation::HOURLY,
        _ => Rotation::NEVER,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file must name a file: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .map_err(|e| eyre::eyre!("create log dir {}: {e}", dir.display()))?;
    RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(name.to_string_lossy().into_owned())
        .build(dir)
        .map_err(|e| eyre::eyre!("open log file {}: {e}", path.display()))
}

/// Flush the file writer. Call before `process::exit`, which skips destructors.
pub fn flush() {
    if let Ok(mut slot) = FILE_GUARD.lock() {
        slot.take();
    }
}
