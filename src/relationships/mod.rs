// src/relationships/mod.rs

//! C4 Relationship Resolver — the hard core of this crate.
//!
//! Combines declared foreign keys, naming-convention candidates, and
//! data-sampled candidates into a single, conflict-resolved edge set with
//! exactly one entry per `(from_table, from_column)`.

pub mod convention;
pub mod mysql_source;
pub mod resolve;
pub mod sampling;

pub use resolve::{Decision, OverrideLogEntry, TAU_ACCEPT, TAU_OVERRIDE};
pub use sampling::ValueSource;

use crate::schema::model::{ForeignKey, SchemaSnapshot};
use convention::ConventionCandidate;
use std::collections::HashSet;
use tracing::{info, warn};

/// The resolved relationship set plus the audit trail the resolver
/// guarantees it logs.
pub struct ResolvedRelationships {
    pub foreign_keys: Vec<ForeignKey>,
    pub overrides: Vec<OverrideLogEntry>,
    pub unresolved_candidates: Vec<ConventionCandidate>,
}

/// Run the full three-source resolution pipeline against a schema
/// snapshot, using `source` for the data-sampling step.
pub fn resolve(
    snapshot: &SchemaSnapshot,
    source: &mut impl ValueSource,
) -> ResolvedRelationships {
    resolve_with_params(
        snapshot,
        source,
        sampling::DEFAULT_SAMPLE_LIMIT,
        resolve::TAU_ACCEPT,
    )
}

pub fn resolve_with_params(
    snapshot: &SchemaSnapshot,
    source: &mut impl ValueSource,
    sample_limit: usize,
    tau_accept: f64,
) -> ResolvedRelationships {
    let declared = snapshot.foreign_keys.clone();
    let declared_columns: HashSet<(String, String)> = declared
        .iter()
        .map(|fk| (fk.from_table.clone(), fk.from_column.clone()))
        .collect();

    let (convention_resolved, unresolved_candidates) = convention::resolve_all(snapshot);

    let all_candidates: Vec<ConventionCandidate> = convention::find_candidates(snapshot);
    let sampled = sampling::sample_candidates(
        snapshot,
        &all_candidates,
        &declared_columns,
        source,
        sample_limit,
        tau_accept,
    );

    let outcome = resolve::merge(declared, convention_resolved, sampled);

    for override_entry in &outcome.overrides {
        info!(
            table = %override_entry.from_table,
            column = %override_entry.from_column,
            previous_origin = ?override_entry.previous_origin,
            previous_target = %override_entry.previous_target,
            new_target = %override_entry.new_target,
            confidence = override_entry.new_confidence,
            "relationship resolver overrode a heuristic candidate with a data-sampled one"
        );
    }
    for candidate in &unresolved_candidates {
        warn!(
            table = %candidate.table,
            column = %candidate.column,
            base = %candidate.base,
            "naming-convention candidate has no matching target table"
        );
    }

    debug_assert!(no_duplicate_columns(&outcome.foreign_keys));

    ResolvedRelationships {
        foreign_keys: outcome.foreign_keys,
        overrides: outcome.overrides,
        unresolved_candidates,
    }
}

fn no_duplicate_columns(fks: &[ForeignKey]) -> bool {
    let mut seen = HashSet::new();
    fks.iter()
        .all(|fk| seen.insert((fk.from_table.clone(), fk.from_column.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::{Column, Database, Table};

    struct EmptySource;
    impl ValueSource for EmptySource {
        fn sample_distinct_values(
            &mut self,
            _table: &str,
            _column: &str,
            _limit: usize,
        ) -> crate::Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn matching_count(
            &mut self,
            _target_table: &str,
            _target_column: &str,
            _values: &[String],
        ) -> crate::Result<usize> {
            Ok(0)
        }
    }

    fn add_column(table: &mut Table, name: &str) {
        table.columns.insert(
            name.to_string(),
            Column {
                name: name.to_string(),
                sql_type: "int".to_string(),
                nullable: true,
                default: None,
                auto_increment: false,
                comment: None,
            },
        );
    }

    #[test]
    fn s1_declared_fk_passes_through_unchanged() {
        let mut snapshot = SchemaSnapshot::new(Database { name: "db".to_string() });
        let mut authors = Table::new("authors");
        add_column(&mut authors, "id");
        add_column(&mut authors, "name");
        authors.primary_keys = vec!["id".to_string()];
        let mut books = Table::new("books");
        add_column(&mut books, "id");
        add_column(&mut books, "title");
        add_column(&mut books, "author_id");
        books.primary_keys = vec!["id".to_string()];
        snapshot.tables.insert("authors".to_string(), authors);
        snapshot.tables.insert("books".to_string(), books);
        snapshot
            .foreign_keys
            .push(ForeignKey::declared("fk_books_author", "books", "author_id", "authors", "id"));

        let mut source = EmptySource;
        let resolved = resolve(&snapshot, &mut source);
        assert_eq!(resolved.foreign_keys.len(), 1);
        assert_eq!(resolved.foreign_keys[0].to_table, "authors");
        assert!(resolved.unresolved_candidates.is_empty());
    }

    #[test]
    fn s2_convention_only_resolves_with_confidence_point_six() {
        let mut snapshot = SchemaSnapshot::new(Database { name: "db".to_string() });
        let mut users = Table::new("app_users");
        add_column(&mut users, "id");
        users.primary_keys = vec!["id".to_string()];
        let mut posts = Table::new("app_posts");
        add_column(&mut posts, "id");
        add_column(&mut posts, "user_id");
        posts.primary_keys = vec!["id".to_string()];
        snapshot.tables.insert("app_users".to_string(), users);
        snapshot.tables.insert("app_posts".to_string(), posts);

        let mut source = EmptySource;
        let resolved = resolve(&snapshot, &mut source);
        assert_eq!(resolved.foreign_keys.len(), 1);
        let fk = &resolved.foreign_keys[0];
        assert_eq!(fk.from_table, "app_posts");
        assert_eq!(fk.to_table, "app_users");
        assert_eq!(fk.confidence, 0.6);
    }

    #[test]
    fn every_target_table_exists_invariant_holds() {
        let mut snapshot = SchemaSnapshot::new(Database { name: "db".to_string() });
        let mut t = Table::new("orphans");
        add_column(&mut t, "id");
        add_column(&mut t, "publisher_id");
        t.primary_keys = vec!["id".to_string()];
        snapshot.tables.insert("orphans".to_string(), t);

        let mut source = EmptySource;
        let resolved = resolve(&snapshot, &mut source);
        assert!(resolved.foreign_keys.is_empty());
        assert_eq!(resolved.unresolved_candidates.len(), 1);
    }
}
