// src/relationships/convention.rs

//! Naming-convention candidate search: affix-stripping and ordered target
//! resolution for foreign-key-shaped column names.

use crate::schema::model::{ForeignKey, SchemaSnapshot};
use indexmap::IndexMap;

const SUFFIXES: &[&str] = &["_id", "_key", "_ref"];
const PREFIXES: &[&str] = &["id_", "fk_"];

/// A column identified as a naming-convention FK candidate, with its
/// affix stripped off to produce the search base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionCandidate {
    pub table: String,
    pub column: String,
    pub base: String,
}

/// Detect whether `column_name` is a convention candidate. Returns the
/// base name (the column minus the matched affix) if so.
pub fn detect_candidate(column_name: &str) -> Option<String> {
    let lower = column_name.to_ascii_lowercase();
    if lower == "id" {
        return None;
    }
    for suffix in SUFFIXES {
        if let Some(base) = lower.strip_suffix(suffix) {
            if !base.is_empty() {
                return Some(base.to_string());
            }
        }
    }
    for prefix in PREFIXES {
        if let Some(base) = lower.strip_prefix(prefix) {
            if !base.is_empty() {
                return Some(base.to_string());
            }
        }
    }
    None
}

/// Scan every table/column in the snapshot and return the convention
/// candidates found (before target resolution).
pub fn find_candidates(snapshot: &SchemaSnapshot) -> Vec<ConventionCandidate> {
    let mut candidates = Vec::new();
    for table in snapshot.tables.values() {
        for column in table.columns.values() {
            if let Some(base) = detect_candidate(&column.name) {
                candidates.push(ConventionCandidate {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    base,
                });
            }
        }
    }
    candidates
}

/// A prefix shared by two or more table names, as split on the first `_`.
/// ("app" for `app_users` / `app_posts`.)
pub fn detect_common_prefixes(tables: &IndexMap<String, crate::schema::model::Table>) -> Vec<String> {
    let mut counts: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    for name in tables.keys() {
        if let Some((prefix, rest)) = name.split_once('_') {
            if !prefix.is_empty() && !rest.is_empty() {
                *counts.entry(prefix.to_string()).or_insert(0) += 1;
            }
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(prefix, _)| prefix)
        .collect()
}

fn naive_plural_forms(base: &str) -> [String; 4] {
    [
        base.to_string(),
        format!("{base}s"),
        format!("{base}es"),
        format!("{base}ies"),
    ]
}

/// Resolve the target table for a convention candidate by trying, in
/// order, the exact base name, its plural forms, and any shared
/// table-name prefix. Returns `(to_table, to_column)` for the first
/// existing table in search order.
pub fn resolve_target(
    current_table: &str,
    column: &str,
    base: &str,
    tables: &IndexMap<String, crate::schema::model::Table>,
    common_prefixes: &[String],
) -> Option<(String, String)> {
    // Step 1: base and its naive plural forms.
    for candidate in naive_plural_forms(base) {
        if tables.contains_key(&candidate) {
            return Some((candidate, "id".to_string()));
        }
    }

    // Step 2: self-reference.
    let self_ref_column = format!("{current_table}_id");
    if base == "parent" || base == "original" || column.eq_ignore_ascii_case(&self_ref_column) {
        if tables.contains_key(current_table) {
            return Some((current_table.to_string(), "id".to_string()));
        }
    }

    // Step 3: common table prefixes, each of the step-1 candidates
    // prepended with the prefix.
    for prefix in common_prefixes {
        for candidate in naive_plural_forms(base) {
            let prefixed = format!("{prefix}_{candidate}");
            if tables.contains_key(&prefixed) {
                return Some((prefixed, "id".to_string()));
            }
        }
    }

    // Step 4: compound bases - last component's plural forms, with and
    // without the detected prefixes.
    if let Some((_, last)) = base.rsplit_once('_') {
        for candidate in naive_plural_forms(last) {
            if tables.contains_key(&candidate) {
                return Some((candidate, "id".to_string()));
            }
        }
        for prefix in common_prefixes {
            for candidate in naive_plural_forms(last) {
                let prefixed = format!("{prefix}_{candidate}");
                if tables.contains_key(&prefixed) {
                    return Some((prefixed, "id".to_string()));
                }
            }
        }
    }

    None
}

/// Resolve every convention candidate in the snapshot into a foreign key,
/// silently dropping candidates with no existing target table (these are
/// logged as unresolved by the caller, `relationships::resolve`).
pub fn resolve_all(snapshot: &SchemaSnapshot) -> (Vec<ForeignKey>, Vec<ConventionCandidate>) {
    let prefixes = detect_common_prefixes(&snapshot.tables);
    let candidates = find_candidates(snapshot);

    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();

    for candidate in candidates {
        match resolve_target(&candidate.table, &candidate.column, &candidate.base, &snapshot.tables, &prefixes) {
            Some((to_table, to_column)) => {
                resolved.push(ForeignKey::convention(
                    candidate.table.clone(),
                    candidate.column.clone(),
                    to_table,
                    to_column,
                ));
            }
            None => unresolved.push(candidate),
        }
    }

    (resolved, unresolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::{Database, Table};

    fn snapshot_with_tables(names: &[&str]) -> SchemaSnapshot {
        let mut snapshot = SchemaSnapshot::new(Database {
            name: "db".to_string(),
        });
        for name in names {
            snapshot.tables.insert(name.to_string(), Table::new(*name));
        }
        snapshot
    }

    #[test]
    fn detect_candidate_matches_suffixes_and_prefixes() {
        assert_eq!(detect_candidate("author_id"), Some("author".to_string()));
        assert_eq!(detect_candidate("category_key"), Some("category".to_string()));
        assert_eq!(detect_candidate("owner_ref"), Some("owner".to_string()));
        assert_eq!(detect_candidate("id_card"), Some("card".to_string()));
        assert_eq!(detect_candidate("fk_user"), Some("user".to_string()));
        assert_eq!(detect_candidate("id"), None);
        assert_eq!(detect_candidate("name"), None);
    }

    #[test]
    fn s2_convention_resolves_via_common_prefix() {
        let snapshot = snapshot_with_tables(&["app_users", "app_posts"]);
        let prefixes = detect_common_prefixes(&snapshot.tables);
        assert_eq!(prefixes, vec!["app".to_string()]);
        let target = resolve_target("app_posts", "user_id", "user", &snapshot.tables, &prefixes);
        assert_eq!(target, Some(("app_users".to_string(), "id".to_string())));
    }

    #[test]
    fn s4_self_reference_resolves_to_current_table() {
        let snapshot = snapshot_with_tables(&["categories"]);
        let prefixes = detect_common_prefixes(&snapshot.tables);
        let target = resolve_target("categories", "parent_id", "parent", &snapshot.tables, &prefixes);
        assert_eq!(target, Some(("categories".to_string(), "id".to_string())));
    }

    #[test]
    fn direct_plural_match_wins_without_a_prefix() {
        let snapshot = snapshot_with_tables(&["authors", "books"]);
        let prefixes = detect_common_prefixes(&snapshot.tables);
        let target = resolve_target("books", "author_id", "author", &snapshot.tables, &prefixes);
        assert_eq!(target, Some(("authors".to_string(), "id".to_string())));
    }

    #[test]
    fn unmatched_candidate_is_left_unresolved() {
        let snapshot = snapshot_with_tables(&["books"]);
        let prefixes = detect_common_prefixes(&snapshot.tables);
        let target = resolve_target("books", "publisher_id", "publisher", &snapshot.tables, &prefixes);
        assert_eq!(target, None);
    }
}
