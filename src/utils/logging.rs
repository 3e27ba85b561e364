use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the crate logs at `info`, or `debug`
/// with `verbose`. With a log file, events are also appended there without
/// ANSI colouring.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sensor_dataset={}", default_level)));

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };

    // A second initialisation (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(())
}
