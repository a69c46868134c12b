// src/main.rs

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mysql2graph::config::{Config, LogFormat, LogLevel, LogOutput, LoggerConfig, Mode};
use tracing::info;

#[derive(Parser)]
#[command(name = "mysql2graph")]
#[command(author, version, about = "Migrate a MySQL schema and its data into RDF and a Dgraph schema", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    mysql: MySqlArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Log level: debug, info, warn, error
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log format: text or json
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Args)]
struct MySqlArgs {
    /// MySQL host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// MySQL port
    #[arg(long, default_value_t = 3306)]
    port: u16,
    /// MySQL user
    #[arg(long, default_value = "root")]
    user: String,
    /// MySQL password
    #[arg(long, default_value = "")]
    password: String,
    /// MySQL database to migrate
    #[arg(long)]
    database: String,
    /// Connection pool cap
    #[arg(long, default_value_t = 16)]
    max_connections: u32,
}

#[derive(Args)]
struct OutputArgs {
    /// Output directory for the schema, data, and mapping files
    #[arg(short, long, default_value = "./output")]
    output_directory: String,
}

#[derive(Args)]
struct PipelineArgs {
    /// Restrict the run to these tables (repeatable); default is all tables
    #[arg(long = "table")]
    tables: Vec<String>,
    /// Worker thread count; 0 uses available parallelism
    #[arg(long, default_value_t = 0)]
    parallel: usize,
    /// Row batch size per query window
    #[arg(long, default_value_t = 5_000)]
    batch_size: u64,
    /// Plan the run and report what would happen without writing output
    #[arg(long)]
    dry_run: bool,
    /// Skip the post-run validation pass (only meaningful in full mode)
    #[arg(long)]
    skip_validation: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the schema, resolve relationships, and emit the Dgraph schema
    Schema {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Stream table data to RDF N-Quads
    Data {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Run schema, data, and validation in sequence
    Full {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Validate existing output against the live source database
    Validate {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

fn parse_log_level(value: &str) -> Result<LogLevel> {
    match value {
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        other => Err(anyhow::anyhow!("unknown log level: {other}")),
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    match value {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(anyhow::anyhow!("unknown log format: {other}")),
    }
}

fn build_config(cli: &Cli, pipeline: &PipelineArgs) -> Result<Config> {
    let mut config = Config::default();

    config.mysql.host = cli.mysql.host.clone();
    config.mysql.port = cli.mysql.port;
    config.mysql.user = cli.mysql.user.clone();
    config.mysql.password = cli.mysql.password.clone();
    config.mysql.database = cli.mysql.database.clone();
    config.mysql.max_connections = cli.mysql.max_connections;

    config.output.directory = cli.output.output_directory.clone();

    config.pipeline.tables = pipeline.tables.clone();
    config.pipeline.workers = pipeline.parallel;
    config.pipeline.batch_size = pipeline.batch_size;
    config.pipeline.dry_run = pipeline.dry_run;
    config.pipeline.skip_validation = pipeline.skip_validation;

    config.logger = LoggerConfig {
        level: parse_log_level(&cli.log_level)?,
        format: parse_log_format(&cli.log_format)?,
        output: LogOutput::Stderr,
        file_path: None,
    };

    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mode, pipeline) = match &cli.command {
        Commands::Schema { pipeline } => (Mode::Schema, pipeline),
        Commands::Data { pipeline } => (Mode::Data, pipeline),
        Commands::Full { pipeline } => (Mode::Full, pipeline),
        Commands::Validate { pipeline } => (Mode::Validate, pipeline),
    };

    let config = build_config(&cli, pipeline)?;
    mysql2graph::logging::init(&config.logger);

    info!(?mode, database = %config.mysql.database, "starting mysql2graph");

    let summary = mysql2graph::run(mode, config)?;

    println!(
        "tables read: {} (skipped: {}), foreign keys resolved: {} (overrides: {}, unresolved: {})",
        summary.tables_read,
        summary.tables_skipped,
        summary.foreign_keys_resolved,
        summary.relationship_overrides,
        summary.unresolved_candidates
    );
    if summary.rows_written > 0 || summary.rows_skipped > 0 {
        println!(
            "rows written: {}, rows skipped: {}, failed jobs: {}",
            summary.rows_written, summary.rows_skipped, summary.jobs_failed
        );
    }
    if let Some(schema_path) = &summary.schema_path {
        println!("schema written to {}", schema_path.display());
    }

    let mut validation_failed = false;
    if let Some(validation) = &summary.validation {
        if validation.passed() {
            println!("validation passed ({} checks)", validation.checks.len());
        } else {
            validation_failed = true;
            println!("validation FAILED:");
            for failure in validation.failures() {
                println!("  {}: {}", failure.name, failure.detail);
            }
        }
    }
    println!("done in {:.2}s", summary.elapsed_secs);

    if validation_failed {
        std::process::exit(2);
    }
    if summary.jobs_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
