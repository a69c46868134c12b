// src/pipeline/emitter.rs

//! C6 RDF Emitter — converts a row to forward/reverse triples and writes
//! them through a single serial sink.

use crate::identifiers::IdentifierMap;
use crate::schema::model::{ForeignKey, Table};
use std::collections::HashMap;
use tracing::warn;

/// A column value carried as raw bytes end to end; typed coercion is
/// deferred to emission time.
pub type RawValue = Option<Vec<u8>>;

/// One row flowing from the batch reader to the emitter.
pub struct RowRecord {
    pub columns: Vec<String>,
    pub values: Vec<RawValue>,
}

/// `(from_table, from_column) -> ForeignKey` lookup used while emitting.
pub type FkIndex = HashMap<(String, String), ForeignKey>;

pub fn build_fk_index(foreign_keys: &[ForeignKey]) -> FkIndex {
    foreign_keys
        .iter()
        .map(|fk| ((fk.from_table.clone(), fk.from_column.clone()), fk.clone()))
        .collect()
}

/// Destination for a row's contiguous block of triples. Implemented by
/// the chunked writer (C8); a single call to `write_row` must place the
/// whole block on disk without another row's lines interleaving.
pub trait RowSink {
    fn write_row(&self, lines: &[String]) -> crate::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Written,
    /// No usable primary value; the row was skipped with a warning.
    Skipped,
}

fn bytes_to_string(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// `true` when a decoded value should be treated as absent: empty, or
/// the literal string `null` (case-insensitive).
fn is_absent(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("null")
}

fn decoded_value(raw: &RawValue) -> Option<String> {
    match raw {
        None => None,
        Some(bytes) => {
            let s = bytes_to_string(bytes);
            if is_absent(&s) {
                None
            } else {
                Some(s)
            }
        }
    }
}

/// The value used to key a row's blank-node identifier: first primary-key
/// column, else the first column literally named `id` or ending in
/// `_id`, else the first column.
fn determine_primary_value(table: &Table, row: &RowRecord) -> Option<String> {
    let index_of = |name: &str| row.columns.iter().position(|c| c == name);

    if let Some(pk) = table.primary_keys.first() {
        if let Some(idx) = index_of(pk) {
            return decoded_value(&row.values[idx]);
        }
    }

    if let Some(idx) = row
        .columns
        .iter()
        .position(|c| c == "id" || c.ends_with("_id"))
    {
        return decoded_value(&row.values[idx]);
    }

    row.values.first().and_then(decoded_value)
}

/// Pluralize a table/collection name. Hand-rolled suffix rules rather
/// than a general-purpose inflector, including the `series -> serieses`
/// quirk that a smarter inflector would "fix" away.
pub fn plural(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if lower.ends_with("ch")
        || lower.ends_with("sh")
        || lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
    {
        format!("{word}es")
    } else if lower.ends_with("fe") {
        format!("{}ves", &word[..word.len() - 2])
    } else if lower.ends_with('f') {
        format!("{}ves", &word[..word.len() - 1])
    } else if lower.ends_with('y') {
        let second_last = lower.chars().rev().nth(1);
        let preceded_by_vowel = matches!(second_last, Some('a' | 'e' | 'i' | 'o' | 'u'));
        if preceded_by_vowel {
            format!("{word}s")
        } else {
            format!("{}ies", &word[..word.len() - 1])
        }
    } else {
        format!("{word}s")
    }
}

/// Escape a string literal: backslash, double quote, newline, carriage
/// return, tab. Backslash must be escaped first
/// so the escapes introduced for the other characters are not themselves
/// re-escaped.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Emit one row's triples through `sink`, as a single atomic block.
/// Returns `RowOutcome::Skipped` (with a logged warning) when the row has
/// no usable primary value.
pub fn emit_row(
    table_name: &str,
    table: &Table,
    row: &RowRecord,
    fk_index: &FkIndex,
    allocator: &IdentifierMap,
    sink: &dyn RowSink,
) -> crate::Result<RowOutcome> {
    let Some(primary_value) = determine_primary_value(table, row) else {
        warn!(table = %table_name, "row has no usable primary value, skipping");
        return Ok(RowOutcome::Skipped);
    };

    let subject = allocator.get_or_create(table_name, &primary_value);
    let mut lines = Vec::with_capacity(row.columns.len() + 1);
    lines.push(format!("{subject} <dgraph.type> \"{table_name}\" ."));

    for (column, raw_value) in row.columns.iter().zip(row.values.iter()) {
        let Some(value) = decoded_value(raw_value) else {
            continue;
        };

        let predicate = format!("{table_name}.{column}");

        if let Some(fk) = fk_index.get(&(table_name.to_string(), column.clone())) {
            let object = allocator.get_or_create(&fk.to_table, &value);
            lines.push(format!("{subject} <{predicate}> {object} ."));
            lines.push(format!("{object} <{predicate}_reverse> {subject} ."));
            let collection_predicate = format!("{}.{}", fk.to_table, plural(table_name));
            lines.push(format!("{object} <{collection_predicate}> {subject} ."));
            continue;
        }

        lines.push(format!("{subject} <{predicate}> \"{}\" .", escape_literal(&value)));
    }

    sink.write_row(&lines)?;
    Ok(RowOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::Column;

    struct CollectingSink {
        lines: std::sync::Mutex<Vec<String>>,
    }

    impl CollectingSink {
        fn new() -> Self {
            Self {
                lines: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn into_lines(self) -> Vec<String> {
            self.lines.into_inner().unwrap()
        }
    }

    impl RowSink for CollectingSink {
        fn write_row(&self, lines: &[String]) -> crate::Result<()> {
            self.lines.lock().unwrap().extend(lines.iter().cloned());
            Ok(())
        }
    }

    fn column(name: &str, sql_type: &str) -> Column {
        Column {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: true,
            default: None,
            auto_increment: false,
            comment: None,
        }
    }

    #[test]
    fn plural_laws_from_property_6() {
        assert_eq!(plural("bus"), "buses");
        assert_eq!(plural("company"), "companies");
        assert_eq!(plural("leaf"), "leaves");
        assert_eq!(plural("user"), "users");
        assert_eq!(plural("series"), "serieses");
    }

    #[test]
    fn s5_escaping_treats_an_embedded_backslash_n_as_two_characters() {
        let input = "a\"b\\nc";
        assert_eq!(escape_literal(input), "a\\\"b\\\\nc");
    }

    #[test]
    fn s1_two_tables_declared_fk() {
        let mut authors = Table::new("authors");
        authors.columns.insert("id".to_string(), column("id", "int"));
        authors.columns.insert("name".to_string(), column("name", "varchar"));
        authors.primary_keys = vec!["id".to_string()];

        let mut books = Table::new("books");
        books.columns.insert("id".to_string(), column("id", "int"));
        books.columns.insert("title".to_string(), column("title", "varchar"));
        books
            .columns
            .insert("author_id".to_string(), column("author_id", "int"));
        books.primary_keys = vec!["id".to_string()];

        let fk = ForeignKey::declared("fk1", "books", "author_id", "authors", "id");
        let fk_index = build_fk_index(&[fk]);
        let allocator = IdentifierMap::new();

        let author_sink = CollectingSink::new();
        let author_row = RowRecord {
            columns: vec!["id".to_string(), "name".to_string()],
            values: vec![Some(b"1".to_vec()), Some(b"Ada".to_vec())],
        };
        emit_row("authors", &authors, &author_row, &fk_index, &allocator, &author_sink).unwrap();
        assert_eq!(
            author_sink.into_lines(),
            vec![
                "_:authors_1 <dgraph.type> \"authors\" .".to_string(),
                "_:authors_1 <authors.id> \"1\" .".to_string(),
                "_:authors_1 <authors.name> \"Ada\" .".to_string(),
            ]
        );

        let book_sink = CollectingSink::new();
        let book_row = RowRecord {
            columns: vec!["id".to_string(), "title".to_string(), "author_id".to_string()],
            values: vec![
                Some(b"10".to_vec()),
                Some(b"T".to_vec()),
                Some(b"1".to_vec()),
            ],
        };
        emit_row("books", &books, &book_row, &fk_index, &allocator, &book_sink).unwrap();
        assert_eq!(
            book_sink.into_lines(),
            vec![
                "_:books_10 <dgraph.type> \"books\" .".to_string(),
                "_:books_10 <books.id> \"10\" .".to_string(),
                "_:books_10 <books.title> \"T\" .".to_string(),
                "_:books_10 <books.author_id> _:authors_1 .".to_string(),
                "_:authors_1 <books.author_id_reverse> _:books_10 .".to_string(),
                "_:authors_1 <authors.books> _:books_10 .".to_string(),
            ]
        );
    }

    #[test]
    fn s4_self_reference_emits_reverse_and_semantic_triples() {
        let mut categories = Table::new("categories");
        categories
            .columns
            .insert("id".to_string(), column("id", "int"));
        categories
            .columns
            .insert("parent_id".to_string(), column("parent_id", "int"));
        categories.primary_keys = vec!["id".to_string()];

        let fk = ForeignKey::convention("categories", "parent_id", "categories", "id");
        let fk_index = build_fk_index(&[fk]);
        let allocator = IdentifierMap::new();

        let sink = CollectingSink::new();
        let row1 = RowRecord {
            columns: vec!["id".to_string(), "parent_id".to_string()],
            values: vec![Some(b"1".to_vec()), None],
        };
        emit_row("categories", &categories, &row1, &fk_index, &allocator, &sink).unwrap();

        let row2 = RowRecord {
            columns: vec!["id".to_string(), "parent_id".to_string()],
            values: vec![Some(b"2".to_vec()), Some(b"1".to_vec())],
        };
        emit_row("categories", &categories, &row2, &fk_index, &allocator, &sink).unwrap();

        let lines = sink.into_lines();
        assert!(lines.contains(&"_:categories_2 <categories.parent_id> _:categories_1 .".to_string()));
        assert!(lines.contains(&"_:categories_1 <categories.parent_id_reverse> _:categories_2 .".to_string()));
        assert!(lines.contains(&"_:categories_1 <categories.categories> _:categories_2 .".to_string()));
    }

    #[test]
    fn row_with_no_primary_value_is_skipped() {
        let mut t = Table::new("logs");
        t.columns.insert("event".to_string(), column("event", "varchar"));
        t.primary_keys = vec!["event".to_string()];

        let fk_index = FkIndex::new();
        let allocator = IdentifierMap::new();
        let sink = CollectingSink::new();
        let row = RowRecord {
            columns: vec!["event".to_string()],
            values: vec![None],
        };
        let outcome = emit_row("logs", &t, &row, &fk_index, &allocator, &sink).unwrap();
        assert_eq!(outcome, RowOutcome::Skipped);
        assert!(sink.into_lines().is_empty());
    }
}
