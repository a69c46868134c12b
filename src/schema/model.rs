// src/schema/model.rs

//! The schema snapshot data model: Database, Table, Column, ForeignKey,
//! Index, and the invariants that connect them.

use indexmap::IndexMap;

/// Where a foreign key was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FkOrigin {
    Declared,
    Convention,
    Data,
}

impl FkOrigin {
    /// The confidence a key of this origin carries when first discovered,
    /// before any data-sampled ratio overrides it.
    pub fn default_confidence(&self) -> f64 {
        match self {
            FkOrigin::Declared => 1.0,
            FkOrigin::Convention => 0.6,
            FkOrigin::Data => 0.0, // data-sampled keys always carry an explicit ratio
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub auto_increment: bool,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    Restrict,
    NoAction,
}

#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub constraint_name: String,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub origin: FkOrigin,
    pub confidence: f64,
    pub on_update: Option<ReferentialAction>,
    pub on_delete: Option<ReferentialAction>,
}

impl ForeignKey {
    pub fn declared(
        constraint_name: impl Into<String>,
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            constraint_name: constraint_name.into(),
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
            origin: FkOrigin::Declared,
            confidence: FkOrigin::Declared.default_confidence(),
            on_update: None,
            on_delete: None,
        }
    }

    pub fn convention(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        let from_table = from_table.into();
        let from_column = from_column.into();
        Self {
            constraint_name: format!("convention_{from_table}_{from_column}"),
            from_table,
            from_column,
            to_table: to_table.into(),
            to_column: to_column.into(),
            origin: FkOrigin::Convention,
            confidence: FkOrigin::Convention.default_confidence(),
            on_update: None,
            on_delete: None,
        }
    }

    pub fn data_sampled(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
        ratio: f64,
    ) -> Self {
        let from_table = from_table.into();
        let from_column = from_column.into();
        Self {
            constraint_name: format!("sampled_{from_table}_{from_column}"),
            from_table,
            from_column,
            to_table: to_table.into(),
            to_column: to_column.into(),
            origin: FkOrigin::Data,
            confidence: ratio,
            on_update: None,
            on_delete: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    BTree,
    Hash,
    FullText,
    Spatial,
}

#[derive(Debug, Clone)]
pub struct Index {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub kind: IndexKind,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    /// Ordinal-position-preserving; required for primary-key ordinal
    /// lookups and deterministic schema emission.
    pub columns: IndexMap<String, Column>,
    /// Ordered by ordinal position within the primary key.
    pub primary_keys: Vec<String>,
    pub row_count: Option<u64>,
    pub engine: Option<String>,
    /// Set when the surrogate-key fallback was applied (no declared
    /// primary key; the first column was used instead).
    pub surrogate_primary_key: bool,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            primary_keys: Vec::new(),
            row_count: None,
            engine: None,
            surrogate_primary_key: false,
        }
    }

    /// Apply the surrogate-key fallback: if no primary key is declared,
    /// use the first column and record that the substitution happened.
    pub fn ensure_primary_key(&mut self) {
        if self.primary_keys.is_empty() {
            if let Some(first) = self.columns.keys().next().cloned() {
                self.primary_keys.push(first);
                self.surrogate_primary_key = true;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Database {
    pub name: String,
}

/// The full, read-only-after-construction snapshot C3 produces and C4, C6,
/// C9 consume.
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    pub database: Database,
    pub tables: IndexMap<String, Table>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<Index>,
    /// Tables whose schema read failed and were excluded under the
    /// per-table failure policy.
    pub skipped_tables: Vec<SkippedTable>,
}

#[derive(Debug, Clone)]
pub struct SkippedTable {
    pub name: String,
    pub reason: String,
}

impl SchemaSnapshot {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            tables: IndexMap::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            skipped_tables: Vec::new(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Assert that every foreign key's endpoints name a table present in
    /// `tables`.
    pub fn validate_invariants(&self) -> Result<(), String> {
        for fk in &self.foreign_keys {
            if !self.has_table(&fk.from_table) {
                return Err(format!(
                    "foreign key {} references unknown from_table {}",
                    fk.constraint_name, fk.from_table
                ));
            }
            if !self.has_table(&fk.to_table) {
                return Err(format!(
                    "foreign key {} references unknown to_table {}",
                    fk.constraint_name, fk.to_table
                ));
            }
        }
        Ok(())
    }
}
