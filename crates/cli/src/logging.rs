use crate::error::CliError;
use chrono::{Local, NaiveDateTime};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";

pub fn log_file_name(now: NaiveDateTime) -> String {
    format!("log_{}.txt", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Installs the global subscriber: console output always, plus a plain-text
/// copy under `log_dir` when one is given. Returns the log file path.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init(log_dir: Option<&Path>) -> Result<Option<PathBuf>, CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, path) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = dir.join(log_file_name(Local::now().naive_local()));
            let file = File::create(&path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))?;

    Ok(path)
}
