//! Logging initialization.
//!
//! The terminal belongs to the TUI, so logs always go to a file under the
//! state directory. `RUST_LOG` overrides the default filter.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::app_dirs::AppDirs;

pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "bookstroke=debug"
    } else {
        "bookstroke=info"
    }
}

/// Install the global subscriber. Returns the log file path on success.
pub fn init_logging(verbose: bool) -> Option<PathBuf> {
    let log_file = AppDirs::log_path()?;

    if let Some(dir) = log_file.parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: Could not create log directory: {e}");
            return None;
        }
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {e}");
            return None;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .try_init()
        .is_ok();

    installed.then_some(log_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_level() {
        assert_eq!(default_filter(false), "bookstroke=info");
        assert_eq!(default_filter(true), "bookstroke=debug");
    }
}
