// src/relationships/sampling.rs

//! Data-driven sampling: for each naming-convention candidate column,
//! sample up to K distinct non-null values and measure how much they
//! overlap with each plausible target table's primary-key values.

use crate::relationships::convention::ConventionCandidate;
use crate::relationships::resolve::TAU_ACCEPT;
use crate::schema::model::{ForeignKey, SchemaSnapshot};
use std::collections::HashSet;
use tracing::debug;

pub const DEFAULT_SAMPLE_LIMIT: usize = 1_000;

/// Abstracts the MySQL queries sampling needs, so the candidate-scoring
/// logic can be unit-tested without a live server.
pub trait ValueSource {
    /// Up to `limit` distinct non-null values from `table.column`.
    fn sample_distinct_values(
        &mut self,
        table: &str,
        column: &str,
        limit: usize,
    ) -> crate::Result<Vec<String>>;

    /// How many of `values` are present among `target_table.target_column`.
    fn matching_count(
        &mut self,
        target_table: &str,
        target_column: &str,
        values: &[String],
    ) -> crate::Result<usize>;
}

/// Sample every still-undeclared convention candidate and return the
/// data-sampled foreign keys whose best-matching target clears
/// `tau_accept`. `declared_columns` excludes columns a declared FK already
/// covers (those are authoritative and never re-sampled).
pub fn sample_candidates(
    snapshot: &SchemaSnapshot,
    candidates: &[ConventionCandidate],
    declared_columns: &HashSet<(String, String)>,
    source: &mut impl ValueSource,
    sample_limit: usize,
    tau_accept: f64,
) -> Vec<ForeignKey> {
    let mut results = Vec::new();

    for candidate in candidates {
        let key = (candidate.table.clone(), candidate.column.clone());
        if declared_columns.contains(&key) {
            continue;
        }

        let values = match source.sample_distinct_values(&candidate.table, &candidate.column, sample_limit) {
            Ok(values) if !values.is_empty() => values,
            Ok(_) => continue,
            Err(e) => {
                debug!(
                    table = %candidate.table,
                    column = %candidate.column,
                    error = %e,
                    "sampling failed for candidate column, skipping"
                );
                continue;
            }
        };

        let mut best: Option<(String, String, f64)> = None;
        for table in snapshot.tables.values() {
            let Some(to_column) = table.primary_keys.first() else {
                continue;
            };
            let matches = match source.matching_count(&table.name, to_column, &values) {
                Ok(m) => m,
                Err(_) => continue,
            };
            let ratio = matches as f64 / values.len() as f64;
            if ratio >= tau_accept {
                let better = best.as_ref().map(|(_, _, r)| ratio > *r).unwrap_or(true);
                if better {
                    best = Some((table.name.clone(), to_column.clone(), ratio));
                }
            }
        }

        if let Some((to_table, to_column, ratio)) = best {
            results.push(ForeignKey::data_sampled(
                candidate.table.clone(),
                candidate.column.clone(),
                to_table,
                to_column,
                ratio,
            ));
        }
    }

    results
}

/// Convenience wrapper using the crate-wide default sample limit and
/// acceptance threshold.
pub fn sample_candidates_default(
    snapshot: &SchemaSnapshot,
    candidates: &[ConventionCandidate],
    declared_columns: &HashSet<(String, String)>,
    source: &mut impl ValueSource,
) -> Vec<ForeignKey> {
    sample_candidates(
        snapshot,
        candidates,
        declared_columns,
        source,
        DEFAULT_SAMPLE_LIMIT,
        TAU_ACCEPT,
    )
}
