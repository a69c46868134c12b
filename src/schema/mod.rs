// src/schema/mod.rs

//! C3 Schema Reader and the schema snapshot data model.

pub mod model;
pub mod reader;

pub use model::{
    Column, Database, FkOrigin, ForeignKey, Index, IndexKind, ReferentialAction, SchemaSnapshot,
    SkippedTable, Table,
};
pub use reader::SchemaReader;
