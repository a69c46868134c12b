// src/config.rs

//! Configuration recognized by the core engine.
//!
//! Loading these values from a file or the command line is the surrounding
//! tool's job; this module only defines the shape the core consumes and a
//! small, explicitly-scoped set of `MYSQL2GRAPH_*` environment variable
//! overrides.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which stage(s) of the pipeline a run should execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Read the schema, resolve relationships, emit the Dgraph schema only.
    Schema,
    /// Stream rows to RDF only, reusing a schema snapshot built in-process.
    Data,
    /// Schema, then data, then schema synthesis, then validation.
    Full,
    /// Run only the integrity validator against existing output.
    Validate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Connection pool cap.
    pub max_connections: u32,
    pub conn_max_lifetime_secs: u64,
    pub conn_max_idle_time_secs: u64,
    /// Per-query timeout.
    pub timeout_secs: u64,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: String::new(),
            max_connections: 16,
            conn_max_lifetime_secs: 3600,
            conn_max_idle_time_secs: 600,
            timeout_secs: 30,
        }
    }
}

impl MySqlConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of worker threads. `0` means "use available parallelism".
    pub workers: usize,
    pub batch_size: u64,
    /// Advisory only; the engine never hard-enforces this.
    pub memory_limit_mb: u64,
    pub dry_run: bool,
    pub skip_validation: bool,
    pub checkpoint_interval_secs: u64,
    pub progress_report_interval_secs: u64,
    /// Allowlist of table names; empty means all tables.
    pub tables: Vec<String>,
    pub chunk_record_threshold: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            batch_size: 5_000,
            memory_limit_mb: 2_048,
            dry_run: false,
            skip_validation: false,
            checkpoint_interval_secs: 30,
            progress_report_interval_secs: 10,
            tables: Vec::new(),
            chunk_record_threshold: 50_000,
        }
    }
}

impl PipelineConfig {
    /// Resolved worker count, defaulting to available parallelism.
    pub fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: String,
    pub rdf_file: String,
    pub schema_file: String,
    pub mapping_file: String,
    pub checkpoint_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./output".to_string(),
            rdf_file: "data.rdf".to_string(),
            schema_file: "schema.dgraph".to_string(),
            mapping_file: "mapping.txt".to_string(),
            checkpoint_file: "checkpoint.json".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn rdf_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.directory).join(&self.rdf_file)
    }

    pub fn schema_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.directory).join(&self.schema_file)
    }

    pub fn mapping_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.directory).join(&self.mapping_file)
    }

    pub fn checkpoint_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.directory).join(&self.checkpoint_file)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Only used when `output == LogOutput::File`.
    pub file_path: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            output: LogOutput::Stderr,
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub mysql: MySqlConfig,
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
    pub logger: LoggerConfig,
}

impl Config {
    /// Validate cross-field invariants the core relies on.
    pub fn validate(&self) -> crate::Result<()> {
        if self.mysql.database.is_empty() {
            return Err(crate::Error::Config(
                "mysql.database must not be empty".to_string(),
            ));
        }
        if self.mysql.max_connections == 0 {
            return Err(crate::Error::Config(
                "mysql.max_connections must be at least 1".to_string(),
            ));
        }
        if self.pipeline.batch_size == 0 {
            return Err(crate::Error::Config(
                "pipeline.batch_size must be at least 1".to_string(),
            ));
        }
        if self.pipeline.chunk_record_threshold == 0 {
            return Err(crate::Error::Config(
                "pipeline.chunk_record_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Overlay a fixed set of `MYSQL2GRAPH_*` environment variables onto this
    /// configuration, so they override matching configuration fields. This
    /// is intentionally a short list of concrete overrides, not a generic
    /// env-binding framework.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("MYSQL2GRAPH_MYSQL_HOST") {
            self.mysql.host = v;
        }
        if let Ok(v) = std::env::var("MYSQL2GRAPH_MYSQL_PORT") {
            if let Ok(port) = v.parse() {
                self.mysql.port = port;
            }
        }
        if let Ok(v) = std::env::var("MYSQL2GRAPH_MYSQL_USER") {
            self.mysql.user = v;
        }
        if let Ok(v) = std::env::var("MYSQL2GRAPH_MYSQL_PASSWORD") {
            self.mysql.password = v;
        }
        if let Ok(v) = std::env::var("MYSQL2GRAPH_MYSQL_DATABASE") {
            self.mysql.database = v;
        }
        if let Ok(v) = std::env::var("MYSQL2GRAPH_MYSQL_MAX_CONNECTIONS") {
            if let Ok(n) = v.parse() {
                self.mysql.max_connections = n;
            }
        }
        if let Ok(v) = std::env::var("MYSQL2GRAPH_WORKERS") {
            if let Ok(n) = v.parse() {
                self.pipeline.workers = n;
            }
        }
        if let Ok(v) = std::env::var("MYSQL2GRAPH_BATCH_SIZE") {
            if let Ok(n) = v.parse() {
                self.pipeline.batch_size = n;
            }
        }
        if let Ok(v) = std::env::var("MYSQL2GRAPH_OUTPUT_DIRECTORY") {
            self.output.directory = v;
        }
        if let Ok(v) = std::env::var("MYSQL2GRAPH_DRY_RUN") {
            self.pipeline.dry_run = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }
}
