// src/pipeline/pool.rs

//! C7 Worker Pool — a bounded producer/consumer pipeline over a table's
//! batch jobs. A submitter thread feeds a bounded job queue, N worker
//! threads fetch-and-emit each window, and a collector aggregates the
//! per-job outcomes on the calling thread. A shared cancellation flag is
//! checked at job receipt and between rows within a job, so a hard
//! failure in one worker stops the others promptly instead of draining
//! the whole queue.

use crate::identifiers::IdentifierMap;
use crate::pipeline::batch::{BatchJob, BatchReader};
use crate::pipeline::emitter::{self, FkIndex, RowSink};
use crate::schema::model::Table;
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::error;

#[derive(Debug, Default, Clone)]
pub struct PoolSummary {
    pub rows_written: u64,
    pub rows_skipped: u64,
    pub jobs_failed: u64,
    pub cancelled: bool,
}

struct JobResult {
    rows_written: u64,
    rows_skipped: u64,
    error: Option<String>,
}

/// Run `jobs` (all windows for a single table) across `worker_count`
/// threads, emitting each fetched row through `sink`.
#[allow(clippy::too_many_arguments)]
pub fn run_worker_pool(
    jobs: Vec<BatchJob>,
    worker_count: usize,
    queue_capacity: usize,
    reader: Arc<BatchReader>,
    table: Arc<Table>,
    fk_index: Arc<FkIndex>,
    allocator: Arc<IdentifierMap>,
    sink: Arc<dyn RowSink + Send + Sync>,
) -> PoolSummary {
    let worker_count = worker_count.max(1);
    let queue_capacity = queue_capacity.max(1);
    let cancel = Arc::new(AtomicBool::new(false));

    let (job_tx, job_rx) = bounded::<BatchJob>(queue_capacity);
    let (result_tx, result_rx) = bounded::<JobResult>(queue_capacity);

    let submitter = {
        let cancel = Arc::clone(&cancel);
        thread::spawn(move || {
            for job in jobs {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                if job_tx.send(job).is_err() {
                    break;
                }
            }
        })
    };

    let mut worker_handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let job_rx = job_rx.clone();
        let result_tx = result_tx.clone();
        let reader = Arc::clone(&reader);
        let table = Arc::clone(&table);
        let fk_index = Arc::clone(&fk_index);
        let allocator = Arc::clone(&allocator);
        let sink = Arc::clone(&sink);
        let cancel = Arc::clone(&cancel);
        worker_handles.push(thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                let outcome = process_job(&job, &reader, &table, &fk_index, &allocator, sink.as_ref(), &cancel);
                let result = match outcome {
                    Ok((written, skipped)) => JobResult {
                        rows_written: written,
                        rows_skipped: skipped,
                        error: None,
                    },
                    Err(e) => {
                        cancel.store(true, Ordering::Relaxed);
                        JobResult {
                            rows_written: 0,
                            rows_skipped: 0,
                            error: Some(e.to_string()),
                        }
                    }
                };
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        }));
    }
    drop(job_rx);
    drop(result_tx);

    let mut summary = PoolSummary::default();
    for result in result_rx {
        summary.rows_written += result.rows_written;
        summary.rows_skipped += result.rows_skipped;
        if let Some(message) = result.error {
            summary.jobs_failed += 1;
            error!(error = %message, "batch job failed, cancelling remaining jobs for this table");
        }
    }

    submitter.join().ok();
    for handle in worker_handles {
        handle.join().ok();
    }

    summary.cancelled = cancel.load(Ordering::Relaxed);
    summary
}

fn process_job(
    job: &BatchJob,
    reader: &BatchReader,
    table: &Table,
    fk_index: &FkIndex,
    allocator: &IdentifierMap,
    sink: &(dyn RowSink + Send + Sync),
    cancel: &AtomicBool,
) -> crate::Result<(u64, u64)> {
    let rows = reader.fetch_batch(table, job)?;
    let mut written = 0u64;
    let mut skipped = 0u64;
    for row in rows {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        match emitter::emit_row(&table.name, table, &row, fk_index, allocator, sink)? {
            emitter::RowOutcome::Written => written += 1,
            emitter::RowOutcome::Skipped => skipped += 1,
        }
    }
    Ok((written, skipped))
}
