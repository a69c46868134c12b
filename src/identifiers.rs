// src/identifiers.rs

//! C2 Identifier Allocator — deterministic, thread-safe blank-node label
//! minting keyed by (table, primary value).
//!
//! The map is sharded by `hash(table, key) mod N` into independently
//! locked buckets to keep contention low under the worker pool's
//! concurrent row processing.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::Path;

const SHARD_COUNT: usize = 64;

#[derive(Default)]
struct Shard {
    // Keyed by (table, raw primary value) -> minted label.
    entries: HashMap<(String, String), String>,
    // Tracks which sanitized labels have already been minted in this shard,
    // so a colliding sanitized value (distinct raw values that sanitize to
    // the same string) gets a deterministic counter suffix instead of
    // silently reusing another row's label.
    minted_labels: HashMap<String, u32>,
}

/// Thread-safe table -> label allocator.
pub struct IdentifierMap {
    shards: Vec<RwLock<Shard>>,
}

impl IdentifierMap {
    pub fn new() -> Self {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        shards.resize_with(SHARD_COUNT, || RwLock::new(Shard::default()));
        Self { shards }
    }

    fn shard_index(table: &str, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        table.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() as usize) % SHARD_COUNT
    }

    /// Return the stable label for `(table, primary_value)`, minting one on
    /// first use. Idempotent: repeated calls with the same key return the
    /// same label.
    pub fn get_or_create(&self, table: &str, primary_value: &str) -> String {
        let idx = Self::shard_index(table, primary_value);
        let entry_key = (table.to_string(), primary_value.to_string());

        // Fast path: shared lock, no mint needed.
        {
            let shard = self.shards[idx].read();
            if let Some(label) = shard.entries.get(&entry_key) {
                return label.clone();
            }
        }

        // Slow path: exclusive lock, recheck before minting (double-checked
        // insert).
        let mut shard = self.shards[idx].write();
        if let Some(label) = shard.entries.get(&entry_key) {
            return label.clone();
        }

        let sanitized = sanitize(primary_value);
        let base_label = format!("_:{}_{}", sanitize(table), sanitized);
        let counter = shard.minted_labels.entry(base_label.clone()).or_insert(0);
        let label = if *counter == 0 {
            base_label.clone()
        } else {
            format!("{base_label}_{counter}")
        };
        *counter += 1;

        shard.entries.insert(entry_key, label.clone());
        label
    }

    /// Number of distinct (table, primary value) pairs minted so far.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist the map as newline-delimited `table:key=label` lines, sorted
    /// by table then key, so two runs over unchanged data produce a
    /// byte-identical mapping file.
    pub fn persist(&self, path: &Path) -> crate::Result<()> {
        let mut rows: Vec<(String, String, String)> = Vec::with_capacity(self.len());
        for shard in &self.shards {
            let shard = shard.read();
            for ((table, key), label) in shard.entries.iter() {
                rows.push((table.clone(), key.clone(), label.clone()));
            }
        }
        rows.sort();

        let file = std::fs::File::create(path).map_err(|source| crate::Error::Write {
            path: path.display().to_string(),
            source,
        })?;
        let mut writer = std::io::BufWriter::new(file);
        for (table, key, label) in rows {
            writeln!(writer, "{table}:{key}={label}").map_err(|source| crate::Error::Write {
                path: path.display().to_string(),
                source,
            })?;
        }
        writer.flush().map_err(|source| crate::Error::Write {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

impl Default for IdentifierMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep only letters, digits, and underscore, as required of blank-node
/// label contents.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn repeated_calls_return_the_same_label() {
        let map = IdentifierMap::new();
        let first = map.get_or_create("authors", "1");
        let second = map.get_or_create("authors", "1");
        assert_eq!(first, second);
        assert_eq!(first, "_:authors_1");
    }

    #[test]
    fn distinct_keys_get_distinct_labels() {
        let map = IdentifierMap::new();
        let a = map.get_or_create("authors", "1");
        let b = map.get_or_create("authors", "2");
        assert_ne!(a, b);
    }

    #[test]
    fn different_tables_do_not_collide() {
        let map = IdentifierMap::new();
        let a = map.get_or_create("authors", "1");
        let b = map.get_or_create("books", "1");
        assert_eq!(a, "_:authors_1");
        assert_eq!(b, "_:books_1");
    }

    #[test]
    fn sanitized_collision_gets_a_counter_suffix() {
        let map = IdentifierMap::new();
        // These two raw values sanitize to the same string but are distinct
        // keys, so the second mint must not silently alias the first.
        let a = map.get_or_create("widgets", "a-b");
        let b = map.get_or_create("widgets", "a b");
        assert_ne!(a, b);
        assert_eq!(a, "_:widgets_a_b");
        assert_eq!(b, "_:widgets_a_b_1");
    }

    #[test]
    fn concurrent_access_is_consistent() {
        let map = Arc::new(IdentifierMap::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let map = Arc::clone(&map);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    let _ = map.get_or_create("t", &i.to_string());
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(map.len(), 100);
    }

    #[test]
    fn persist_writes_sorted_deterministic_lines() {
        let map = IdentifierMap::new();
        map.get_or_create("books", "10");
        map.get_or_create("authors", "1");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.txt");
        map.persist(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["authors:1=_:authors_1", "books:10=_:books_10"]);
    }
}
