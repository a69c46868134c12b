// src/pipeline/mod.rs

//! Wires the batch reader (C5), RDF emitter (C6), worker pool (C7), and
//! chunked writer (C8) into a single data-migration pass over every
//! table in a resolved schema snapshot.

pub mod batch;
pub mod emitter;
pub mod pool;
pub mod writer;

use crate::config::{OutputConfig, PipelineConfig};
use crate::identifiers::IdentifierMap;
use crate::schema::model::{ForeignKey, SchemaSnapshot, Table};
use batch::{plan_jobs, BatchReader};
use emitter::{build_fk_index, FkIndex};
use mysql::Pool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use writer::ChunkedWriter;

#[derive(Debug, Clone, Default)]
pub struct DataRunSummary {
    pub rows_written: u64,
    pub rows_skipped: u64,
    pub jobs_failed: u64,
    pub per_table_rows: HashMap<String, u64>,
    pub rdf_chunks: Vec<std::path::PathBuf>,
    pub mapping_path: std::path::PathBuf,
}

fn base_name_for(output: &OutputConfig) -> String {
    std::path::Path::new(&output.rdf_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string())
}

/// Stream every (filtered) table's rows to RDF, sharing one identifier
/// allocator and one chunked writer across the whole run.
pub fn run_data(
    pool: Pool,
    snapshot: &SchemaSnapshot,
    foreign_keys: &[ForeignKey],
    pipeline: &PipelineConfig,
    output: &OutputConfig,
) -> crate::Result<DataRunSummary> {
    let reader = Arc::new(BatchReader::new(pool));
    let fk_index: Arc<FkIndex> = Arc::new(build_fk_index(foreign_keys));
    let allocator = Arc::new(IdentifierMap::new());
    let base_name = base_name_for(output);
    let writer = Arc::new(ChunkedWriter::create(
        &output.directory,
        base_name,
        pipeline.chunk_record_threshold,
    )?);

    let mut summary = DataRunSummary::default();
    let table_names: Vec<&str> = if pipeline.tables.is_empty() {
        snapshot.tables.keys().map(|s| s.as_str()).collect()
    } else {
        pipeline
            .tables
            .iter()
            .map(|s| s.as_str())
            .filter(|name| snapshot.has_table(name))
            .collect()
    };

    let workers = pipeline.resolved_workers();
    let queue_capacity = workers.saturating_mul(4).max(8);

    for table_name in table_names {
        let table = snapshot
            .table(table_name)
            .expect("table name was taken from the snapshot itself");
        let row_count = reader.row_count(table_name)?;
        let jobs = plan_jobs(table_name, row_count, pipeline.batch_size);
        info!(table = table_name, row_count, jobs = jobs.len(), "starting table migration");

        let table_arc = Arc::new(table.clone());
        let pool_summary = pool::run_worker_pool(
            jobs,
            workers,
            queue_capacity,
            Arc::clone(&reader),
            table_arc,
            Arc::clone(&fk_index),
            Arc::clone(&allocator),
            Arc::clone(&writer) as Arc<dyn emitter::RowSink + Send + Sync>,
        );

        summary.rows_written += pool_summary.rows_written;
        summary.rows_skipped += pool_summary.rows_skipped;
        summary.jobs_failed += pool_summary.jobs_failed;
        summary
            .per_table_rows
            .insert(table_name.to_string(), pool_summary.rows_written);

        if pool_summary.cancelled {
            info!(table = table_name, "table migration cancelled after a job failure");
        }
    }

    let (manifest, _total) = writer.close()?;
    summary.rdf_chunks = manifest.into_iter().map(|record| record.filename).collect();

    let mapping_path = output.mapping_path();
    allocator.persist(&mapping_path)?;
    summary.mapping_path = mapping_path;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_the_extension() {
        let output = OutputConfig::default();
        assert_eq!(base_name_for(&output), "data");
    }
}
