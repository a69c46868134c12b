// src/lib.rs

//! mysql2graph
//!
//! Migrates a MySQL relational schema and its data into an RDF N-Quads
//! data set plus a matching Dgraph schema.
//!
//! # Architecture
//!
//! - Schema read, relationship resolution, data streaming, schema
//!   synthesis, and validation are independent stages, each runnable on
//!   its own through [`Mode`].
//! - Relationships come from three sources — declared foreign keys,
//!   naming conventions, and sampled data — merged by a single
//!   confidence-ordered conflict rule.
//! - Row streaming fans out across a bounded worker pool and converges
//!   on one serial, chunk-rolling writer.

pub mod config;
pub mod error;
pub mod identifiers;
pub mod logging;
pub mod pipeline;
pub mod relationships;
pub mod schema;
pub mod schema_synth;
pub mod types;
pub mod validator;

pub use config::{Config, Mode};
pub use error::{Error, Result};

use mysql::{Opts, OptsBuilder, Pool};
use relationships::mysql_source::MySqlValueSource;
use schema::{ForeignKey, SchemaReader, SchemaSnapshot};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

/// Everything a single invocation of [`run`] produced, regardless of
/// which stages `mode` actually ran.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub tables_read: usize,
    pub tables_skipped: usize,
    pub foreign_keys_resolved: usize,
    pub relationship_overrides: usize,
    pub unresolved_candidates: usize,
    pub rows_written: u64,
    pub rows_skipped: u64,
    pub jobs_failed: u64,
    pub rdf_chunks: Vec<std::path::PathBuf>,
    pub schema_path: Option<std::path::PathBuf>,
    pub validation: Option<validator::ValidationSummary>,
    pub elapsed_secs: f64,
}

fn open_pool(mysql_config: &config::MySqlConfig) -> crate::Result<Pool> {
    let opts = OptsBuilder::default()
        .ip_or_hostname(Some(mysql_config.host.clone()))
        .tcp_port(mysql_config.port)
        .user(Some(mysql_config.user.clone()))
        .pass(Some(mysql_config.password.clone()))
        .db_name(Some(mysql_config.database.clone()));
    let opts: Opts = opts.into();
    Pool::new(opts).map_err(|source| Error::Connection {
        host: mysql_config.host.clone(),
        port: mysql_config.port,
        database: mysql_config.database.clone(),
        source,
    })
}

/// Read the schema and resolve its relationships in one pass, since both
/// `Mode::Schema` and `Mode::Full` need the same resolved snapshot.
fn read_and_resolve(config: &Config) -> crate::Result<(SchemaSnapshot, Vec<ForeignKey>, usize, usize)> {
    let reader = SchemaReader::connect(&config.mysql)?;
    let mut snapshot = reader.read_snapshot(&config.pipeline.tables)?;

    let pool = open_pool(&config.mysql)?;
    let mut source = MySqlValueSource::new(pool);
    let resolved = relationships::resolve(&snapshot, &mut source);

    for entry in &resolved.overrides {
        info!(
            table = %entry.from_table,
            column = %entry.from_column,
            previous_target = %entry.previous_target,
            new_target = %entry.new_target,
            "data sampling overrode a naming-convention relationship"
        );
    }

    let overrides = resolved.overrides.len();
    let unresolved = resolved.unresolved_candidates.len();
    snapshot.foreign_keys = resolved.foreign_keys;

    snapshot.validate_invariants().map_err(Error::Config)?;
    let foreign_keys = snapshot.foreign_keys.clone();

    Ok((snapshot, foreign_keys, overrides, unresolved))
}

fn write_schema_file(
    snapshot: &SchemaSnapshot,
    foreign_keys: &[ForeignKey],
    output: &config::OutputConfig,
) -> crate::Result<std::path::PathBuf> {
    std::fs::create_dir_all(&output.directory)?;
    let rendered = schema_synth::synthesize_schema(snapshot, foreign_keys);
    let path = output.schema_path();
    std::fs::write(&path, rendered).map_err(|source| Error::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}

/// Run `mode` to completion against `config`. This is the single library
/// entry point; the CLI binary is a thin wrapper around it.
pub fn run(mode: Mode, config: Config) -> crate::Result<RunSummary> {
    config.validate()?;
    let started = Instant::now();
    let mut summary = RunSummary::default();

    match mode {
        Mode::Schema => {
            let (snapshot, foreign_keys, overrides, unresolved) = read_and_resolve(&config)?;
            summary.tables_read = snapshot.tables.len();
            summary.tables_skipped = snapshot.skipped_tables.len();
            summary.foreign_keys_resolved = foreign_keys.len();
            summary.relationship_overrides = overrides;
            summary.unresolved_candidates = unresolved;
            summary.schema_path = Some(write_schema_file(&snapshot, &foreign_keys, &config.output)?);
        }
        Mode::Data => {
            let (snapshot, foreign_keys, overrides, unresolved) = read_and_resolve(&config)?;
            summary.tables_read = snapshot.tables.len();
            summary.tables_skipped = snapshot.skipped_tables.len();
            summary.foreign_keys_resolved = foreign_keys.len();
            summary.relationship_overrides = overrides;
            summary.unresolved_candidates = unresolved;

            if config.pipeline.dry_run {
                info!("dry run requested, skipping data streaming");
            } else {
                let pool = open_pool(&config.mysql)?;
                let data_summary = pipeline::run_data(
                    pool,
                    &snapshot,
                    &foreign_keys,
                    &config.pipeline,
                    &config.output,
                )?;
                summary.rows_written = data_summary.rows_written;
                summary.rows_skipped = data_summary.rows_skipped;
                summary.jobs_failed = data_summary.jobs_failed;
                summary.rdf_chunks = data_summary.rdf_chunks;
            }
        }
        Mode::Full => {
            let (snapshot, foreign_keys, overrides, unresolved) = read_and_resolve(&config)?;
            summary.tables_read = snapshot.tables.len();
            summary.tables_skipped = snapshot.skipped_tables.len();
            summary.foreign_keys_resolved = foreign_keys.len();
            summary.relationship_overrides = overrides;
            summary.unresolved_candidates = unresolved;
            summary.schema_path = Some(write_schema_file(&snapshot, &foreign_keys, &config.output)?);

            let mut emitted_row_counts = HashMap::new();
            if config.pipeline.dry_run {
                info!("dry run requested, skipping data streaming");
            } else {
                let pool = open_pool(&config.mysql)?;
                let data_summary = pipeline::run_data(
                    pool,
                    &snapshot,
                    &foreign_keys,
                    &config.pipeline,
                    &config.output,
                )?;
                summary.rows_written = data_summary.rows_written;
                summary.rows_skipped = data_summary.rows_skipped;
                summary.jobs_failed = data_summary.jobs_failed;
                summary.rdf_chunks = data_summary.rdf_chunks;
                emitted_row_counts = data_summary.per_table_rows;
            }

            if !config.pipeline.skip_validation && !config.pipeline.dry_run {
                let pool = open_pool(&config.mysql)?;
                let validation = validator::run_validation(
                    Some(&pool),
                    &snapshot,
                    &foreign_keys,
                    &config.output,
                    &summary.rdf_chunks,
                    &emitted_row_counts,
                )?;
                if !validation.passed() {
                    warn!(failures = ?validation.failures(), "validation reported failures");
                }
                summary.validation = Some(validation);
            }
        }
        Mode::Validate => {
            let chunks = existing_rdf_chunks(&config.output)?;
            let emitted_row_counts = validator::count_rows_per_table_from_rdf(&chunks)?;
            let (snapshot, foreign_keys, overrides, unresolved) = read_and_resolve(&config)?;
            summary.tables_read = snapshot.tables.len();
            summary.tables_skipped = snapshot.skipped_tables.len();
            summary.foreign_keys_resolved = foreign_keys.len();
            summary.relationship_overrides = overrides;
            summary.unresolved_candidates = unresolved;
            summary.rdf_chunks = chunks;

            let pool = open_pool(&config.mysql)?;
            let validation = validator::run_validation(
                Some(&pool),
                &snapshot,
                &foreign_keys,
                &config.output,
                &summary.rdf_chunks,
                &emitted_row_counts,
            )?;
            if !validation.passed() {
                warn!(failures = ?validation.failures(), "validation reported failures");
            }
            summary.validation = Some(validation);
        }
    }

    summary.elapsed_secs = started.elapsed().as_secs_f64();
    Ok(summary)
}

/// Rediscover a prior data run's chunk files from disk for `Mode::Validate`,
/// which has no in-process manifest to work from. Chunk files are named
/// `{base_name}_chunk_<n>.rdf` (see `pipeline::writer`); ordering by the
/// numeric index rather than lexicographically keeps chunk 10 after chunk 9
/// once a run produces ten or more chunks.
fn existing_rdf_chunks(output: &config::OutputConfig) -> crate::Result<Vec<std::path::PathBuf>> {
    let base_name = std::path::Path::new(&output.rdf_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let prefix = format!("{base_name}_chunk_");

    let mut chunks: Vec<(u32, std::path::PathBuf)> = Vec::new();
    let read_dir = match std::fs::read_dir(&output.directory) {
        Ok(entries) => entries,
        Err(_) => return Ok(Vec::new()),
    };
    for entry in read_dir.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy().into_owned();
        let Some(rest) = name.strip_prefix(&prefix) else {
            continue;
        };
        let Some(index_str) = rest.strip_suffix(".rdf") else {
            continue;
        };
        if let Ok(index) = index_str.parse::<u32>() {
            chunks.push((index, entry.path()));
        }
    }
    chunks.sort_by_key(|(index, _)| *index);
    Ok(chunks.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_rdf_chunks_orders_numerically_not_lexicographically() {
        let dir = tempfile::tempdir().unwrap();
        for i in [0, 1, 2, 9, 10, 11] {
            std::fs::write(dir.path().join(format!("data_chunk_{i}.rdf")), "x").unwrap();
        }
        let output = config::OutputConfig {
            directory: dir.path().display().to_string(),
            ..Default::default()
        };
        let chunks = existing_rdf_chunks(&output).unwrap();
        let names: Vec<String> = chunks
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "data_chunk_0.rdf",
                "data_chunk_1.rdf",
                "data_chunk_2.rdf",
                "data_chunk_9.rdf",
                "data_chunk_10.rdf",
                "data_chunk_11.rdf",
            ]
        );
    }

    #[test]
    fn existing_rdf_chunks_ignores_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data_chunk_0.rdf"), "x").unwrap();
        std::fs::write(dir.path().join("schema.dgraph"), "x").unwrap();
        std::fs::write(dir.path().join("mapping.txt"), "x").unwrap();
        let output = config::OutputConfig {
            directory: dir.path().display().to_string(),
            ..Default::default()
        };
        let chunks = existing_rdf_chunks(&output).unwrap();
        assert_eq!(chunks.len(), 1);
    }
}
