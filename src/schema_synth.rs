// src/schema_synth.rs

//! C9 Schema Synthesizer — turns a resolved schema snapshot and its
//! foreign keys into a Dgraph schema file: one predicate declaration per
//! scalar column or edge, and one type block per table, both emitted in
//! sorted, deterministic order.

use crate::schema::model::{ForeignKey, SchemaSnapshot};
use crate::types::{map_sql_type, tokenizer_for, wants_upsert};
use std::collections::{BTreeMap, BTreeSet};

/// Render the full Dgraph schema (predicate declarations, then type
/// blocks) for a resolved schema snapshot.
pub fn synthesize_schema(snapshot: &SchemaSnapshot, foreign_keys: &[ForeignKey]) -> String {
    let fk_by_column: BTreeMap<(String, String), &ForeignKey> = foreign_keys
        .iter()
        .map(|fk| ((fk.from_table.clone(), fk.from_column.clone()), fk))
        .collect();

    let mut predicates: BTreeMap<String, String> = BTreeMap::new();
    // owning type -> predicate names it should list in its `type { }` block.
    let mut type_predicates: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for table in snapshot.tables.values() {
        let owned = type_predicates.entry(table.name.clone()).or_default();

        for (column_name, column) in table.columns.iter() {
            let predicate = format!("{}.{}", table.name, column_name);
            let fk = fk_by_column.get(&(table.name.clone(), column_name.clone()));

            if let Some(fk) = fk {
                predicates
                    .entry(predicate.clone())
                    .or_insert_with(|| format!("{predicate}: uid @reverse ."));
                owned.insert(predicate.clone());

                let reverse_predicate = format!("{predicate}_reverse");
                predicates
                    .entry(reverse_predicate.clone())
                    .or_insert_with(|| format!("{reverse_predicate}: [uid] @reverse ."));
                type_predicates
                    .entry(fk.to_table.clone())
                    .or_default()
                    .insert(reverse_predicate);

                let collection_predicate =
                    format!("{}.{}", fk.to_table, crate::pipeline::emitter::plural(&table.name));
                predicates
                    .entry(collection_predicate.clone())
                    .or_insert_with(|| format!("{collection_predicate}: [uid] @reverse ."));
                type_predicates
                    .entry(fk.to_table.clone())
                    .or_default()
                    .insert(collection_predicate);
                continue;
            }

            let graph_type = map_sql_type(&column.sql_type);
            let is_primary_key = table.primary_keys.iter().any(|pk| pk == column_name);
            let tokenizer = tokenizer_for(graph_type, column_name);
            let upsert = wants_upsert(column_name, is_primary_key);

            let mut decl = format!(
                "{predicate}: {} @index({}) ",
                graph_type.as_dgraph_str(),
                tokenizer.as_dgraph_str()
            );
            if upsert {
                decl.push_str("@upsert ");
            }
            decl.push('.');

            predicates.entry(predicate.clone()).or_insert(decl);
            owned.insert(predicate);
        }
    }

    let mut out = String::new();
    out.push_str("dgraph.type: string @index(exact) .\n\n");
    for decl in predicates.values() {
        out.push_str(decl);
        out.push('\n');
    }
    out.push('\n');

    for (table_name, predicates) in &type_predicates {
        out.push_str(&format!("type {table_name} {{\n"));
        out.push_str("  dgraph.type\n");
        for predicate in predicates {
            out.push_str(&format!("  {predicate}\n"));
        }
        out.push_str("}\n\n");
    }

    out
}
