// src/logging.rs

//! Logging initialization driven by `config::LoggerConfig`.

use crate::config::{LogFormat, LogOutput, LoggerConfig};
use std::fs::OpenOptions;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Safe to call more than once
/// per process (subsequent calls are ignored) so tests can call it freely.
pub fn init(config: &LoggerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match (config.format, &config.output) {
        (LogFormat::Json, LogOutput::File) => {
            if let Some(writer) = open_log_file(config) {
                builder.json().with_writer(writer).try_init()
            } else {
                builder.json().try_init()
            }
        }
        (LogFormat::Json, LogOutput::Stdout) => builder.json().try_init(),
        (LogFormat::Json, LogOutput::Stderr) => {
            builder.json().with_writer(std::io::stderr).try_init()
        }
        (LogFormat::Text, LogOutput::File) => {
            if let Some(writer) = open_log_file(config) {
                builder.with_writer(writer).try_init()
            } else {
                builder.try_init()
            }
        }
        (LogFormat::Text, LogOutput::Stdout) => builder.try_init(),
        (LogFormat::Text, LogOutput::Stderr) => {
            builder.with_writer(std::io::stderr).try_init()
        }
    };

    // A second init in the same process (common in tests) returns Err; that
    // is not a fatal condition, just a no-op.
    let _ = result;
}

fn open_log_file(config: &LoggerConfig) -> Option<std::fs::File> {
    let path = config.file_path.as_ref()?;
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("mysql2graph: failed to open log file {path}: {e}");
            None
        }
    }
}
