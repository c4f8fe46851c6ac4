//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level. With `[logging] file`
//! set, events go to that file (appended, no ANSI colors); otherwise to stderr.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Open `path` for appending, creating it and its parent directories
pub fn open_log_file(path: &Path) -> Result<Mutex<File>> {
    let open = || -> std::io::Result<File> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    };
    open().map(Mutex::new).map_err(|source| Error::LogFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Install the global subscriber for `config`
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &config.file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(open_log_file(path)?)
            .init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn log_to(path: &Path, message: &str) {
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(open_log_file(path).unwrap())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(source = "sales", "{}", message);
        });
    }

    #[test]
    fn test_events_land_in_log_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("dash-feed.log");

        log_to(&path, "Fetched source data");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("INFO"));
        assert!(content.contains("Fetched source data"));
    }

    #[test]
    fn test_log_file_is_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dash-feed.log");

        log_to(&path, "first run");
        log_to(&path, "second run");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("first run"));
        assert!(content.contains("second run"));
    }

    #[test]
    fn test_unopenable_log_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let path = blocker.join("dash-feed.log");

        match open_log_file(&path) {
            Err(Error::LogFile { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected log file error, got {:?}", other.map(|_| ())),
        }
    }
}
