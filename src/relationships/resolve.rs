// src/relationships/resolve.rs

//! Merge and conflict resolution across the three relationship sources.
//! The priority rule is represented as a strict, exhaustively-testable
//! function rather than left as an inline if-chain.

use crate::schema::model::{FkOrigin, ForeignKey};
use indexmap::IndexMap;

/// Threshold a data-sampled candidate's ratio must clear to be retained
/// as a candidate at all.
pub const TAU_ACCEPT: f64 = 0.5;

/// Threshold a data-sampled candidate's ratio must clear to replace an
/// existing convention-origin entry.
pub const TAU_OVERRIDE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Replace,
}

/// Decide whether an incoming foreign key candidate should replace an
/// existing merged entry for the same `(from_table, from_column)`.
///
/// Declared entries are never replaced. A convention entry is replaced
/// only by a data-sampled candidate whose ratio exceeds `TAU_OVERRIDE`.
/// Every other combination keeps the existing entry.
pub fn resolve_conflict(
    existing: (FkOrigin, f64),
    incoming: (FkOrigin, f64),
) -> Decision {
    let (existing_origin, _existing_confidence) = existing;
    let (incoming_origin, incoming_confidence) = incoming;

    if existing_origin == FkOrigin::Declared {
        return Decision::Keep;
    }

    if existing_origin == FkOrigin::Convention
        && incoming_origin == FkOrigin::Data
        && incoming_confidence > TAU_OVERRIDE
    {
        return Decision::Replace;
    }

    Decision::Keep
}

#[derive(Debug, Clone)]
pub struct OverrideLogEntry {
    pub from_table: String,
    pub from_column: String,
    pub previous_origin: FkOrigin,
    pub previous_target: String,
    pub new_origin: FkOrigin,
    pub new_target: String,
    pub new_confidence: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub foreign_keys: Vec<ForeignKey>,
    pub overrides: Vec<OverrideLogEntry>,
}

/// Merge declared, convention, and data-sampled foreign key candidates
/// into the final, conflict-resolved set.
pub fn merge(
    declared: Vec<ForeignKey>,
    convention: Vec<ForeignKey>,
    sampled: Vec<ForeignKey>,
) -> MergeOutcome {
    let mut merged: IndexMap<(String, String), ForeignKey> = IndexMap::new();

    // (a) Declared keys are inserted verbatim and never overridden.
    for fk in declared {
        merged.insert((fk.from_table.clone(), fk.from_column.clone()), fk);
    }

    // (b) Convention candidates not already covered by a declared key.
    for fk in convention {
        let key = (fk.from_table.clone(), fk.from_column.clone());
        merged.entry(key).or_insert(fk);
    }

    // (c) Data-sampled candidates, strictly above the merge threshold.
    let mut overrides = Vec::new();
    for fk in sampled {
        if fk.confidence <= TAU_ACCEPT {
            continue;
        }
        let key = (fk.from_table.clone(), fk.from_column.clone());
        match merged.get(&key) {
            None => {
                merged.insert(key, fk);
            }
            Some(existing) => {
                let decision = resolve_conflict(
                    (existing.origin, existing.confidence),
                    (fk.origin, fk.confidence),
                );
                if decision == Decision::Replace {
                    overrides.push(OverrideLogEntry {
                        from_table: fk.from_table.clone(),
                        from_column: fk.from_column.clone(),
                        previous_origin: existing.origin,
                        previous_target: existing.to_table.clone(),
                        new_origin: fk.origin,
                        new_target: fk.to_table.clone(),
                        new_confidence: fk.confidence,
                    });
                    merged.insert(key, fk);
                }
            }
        }
    }

    MergeOutcome {
        foreign_keys: merged.into_values().collect(),
        overrides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_is_never_overridden_by_anything() {
        assert_eq!(
            resolve_conflict((FkOrigin::Declared, 1.0), (FkOrigin::Data, 0.99)),
            Decision::Keep
        );
        assert_eq!(
            resolve_conflict((FkOrigin::Declared, 1.0), (FkOrigin::Convention, 0.6)),
            Decision::Keep
        );
    }

    #[test]
    fn convention_is_replaced_only_by_high_confidence_data() {
        assert_eq!(
            resolve_conflict((FkOrigin::Convention, 0.6), (FkOrigin::Data, 0.9)),
            Decision::Replace
        );
        assert_eq!(
            resolve_conflict((FkOrigin::Convention, 0.6), (FkOrigin::Data, 0.6)),
            Decision::Keep
        );
        assert_eq!(
            resolve_conflict((FkOrigin::Convention, 0.6), (FkOrigin::Data, 0.8)),
            Decision::Keep,
            "ratio must exceed, not merely equal, the override threshold"
        );
    }

    #[test]
    fn property_5_relationship_override_rule() {
        // declared A.x -> B vs sampled A.x -> C ratio > 0.8: declared wins.
        let outcome = merge(
            vec![ForeignKey::declared("fk1", "a", "x", "b", "id")],
            vec![],
            vec![ForeignKey::data_sampled("a", "x", "c", "id", 0.95)],
        );
        assert_eq!(outcome.foreign_keys.len(), 1);
        assert_eq!(outcome.foreign_keys[0].to_table, "b");
        assert!(outcome.overrides.is_empty());

        // convention A.x -> B vs sampled A.x -> C ratio > 0.8: sampled wins.
        let outcome = merge(
            vec![],
            vec![ForeignKey::convention("a", "x", "b", "id")],
            vec![ForeignKey::data_sampled("a", "x", "c", "id", 0.95)],
        );
        assert_eq!(outcome.foreign_keys.len(), 1);
        assert_eq!(outcome.foreign_keys[0].to_table, "c");
        assert_eq!(outcome.overrides.len(), 1);

        // convention A.x -> B vs sampled A.x -> C ratio 0.6: convention wins.
        let outcome = merge(
            vec![],
            vec![ForeignKey::convention("a", "x", "b", "id")],
            vec![ForeignKey::data_sampled("a", "x", "c", "id", 0.6)],
        );
        assert_eq!(outcome.foreign_keys.len(), 1);
        assert_eq!(outcome.foreign_keys[0].to_table, "b");
        assert!(outcome.overrides.is_empty());
    }

    #[test]
    fn sampled_candidate_at_or_below_threshold_is_dropped_entirely() {
        let outcome = merge(
            vec![],
            vec![],
            vec![ForeignKey::data_sampled("a", "x", "c", "id", 0.5)],
        );
        assert!(outcome.foreign_keys.is_empty());
    }

    #[test]
    fn merge_produces_exactly_one_entry_per_column() {
        let outcome = merge(
            vec![ForeignKey::declared("fk1", "books", "author_id", "authors", "id")],
            vec![ForeignKey::convention("books", "author_id", "wrong", "id")],
            vec![ForeignKey::data_sampled("books", "author_id", "also_wrong", "id", 0.99)],
        );
        assert_eq!(outcome.foreign_keys.len(), 1);
        assert_eq!(outcome.foreign_keys[0].to_table, "authors");
    }
}
