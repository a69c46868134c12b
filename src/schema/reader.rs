// src/schema/reader.rs

//! C3 Schema Reader — enumerates tables, columns, primary keys, declared
//! foreign keys, and indexes from the MySQL `information_schema` catalog.

use crate::config::MySqlConfig;
use crate::error::Error;
use crate::schema::model::{
    Column, Database, ForeignKey, Index, IndexKind, ReferentialAction, SchemaSnapshot,
    SkippedTable, Table,
};
use mysql::prelude::*;
use mysql::{Opts, OptsBuilder, Pool, PooledConn};
use tracing::{debug, info, warn};

/// Names excluded from the table list: dotfiles and temp/backup tables.
fn is_excluded_table_name(name: &str) -> bool {
    name.starts_with('.') || name.ends_with(".tmp") || name.ends_with(".bak")
}

pub struct SchemaReader {
    pool: Pool,
    database: String,
}

impl SchemaReader {
    pub fn connect(config: &MySqlConfig) -> crate::Result<Self> {
        let opts = OptsBuilder::default()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(config.database.clone()));
        let opts: Opts = opts.into();

        let pool = Pool::new(opts).map_err(|source| Error::Connection {
            host: config.host.clone(),
            port: config.port,
            database: config.database.clone(),
            source,
        })?;

        // Fail fast: make sure at least one connection succeeds before
        // reporting this as a usable reader.
        pool.get_conn().map_err(|source| Error::Connection {
            host: config.host.clone(),
            port: config.port,
            database: config.database.clone(),
            source,
        })?;

        info!(
            host = %config.host,
            database = %config.database,
            "connected to mysql"
        );

        Ok(Self {
            pool,
            database: config.database.clone(),
        })
    }

    fn conn(&self) -> crate::Result<PooledConn> {
        Ok(self.pool.get_conn()?)
    }

    /// Build the full schema snapshot, honoring an optional table
    /// allowlist (empty means all tables). Per-table failures are logged
    /// and recorded in `skipped_tables`; the run proceeds with the subset
    /// that succeeded.
    pub fn read_snapshot(&self, table_allowlist: &[String]) -> crate::Result<SchemaSnapshot> {
        let mut snapshot = SchemaSnapshot::new(Database {
            name: self.database.clone(),
        });

        let table_names = self.list_table_names(table_allowlist)?;
        for name in table_names {
            match self.read_table(&name) {
                Ok(table) => {
                    snapshot.tables.insert(name, table);
                }
                Err(e) => {
                    warn!(table = %name, error = %e, "schema read failed for table, skipping");
                    snapshot.skipped_tables.push(SkippedTable {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        for table in snapshot.tables.values_mut() {
            table.ensure_primary_key();
        }

        snapshot.foreign_keys = self.read_declared_foreign_keys(&snapshot)?;
        snapshot.indexes = self.read_indexes(&snapshot)?;

        Ok(snapshot)
    }

    fn list_table_names(&self, allowlist: &[String]) -> crate::Result<Vec<String>> {
        let mut conn = self.conn()?;
        let rows: Vec<String> = conn.exec(
            "SELECT TABLE_NAME FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = :db AND TABLE_TYPE IN ('BASE TABLE', 'VIEW')",
            mysql::params! { "db" => &self.database },
        )?;

        let names: Vec<String> = rows
            .into_iter()
            .filter(|name| !is_excluded_table_name(name))
            .filter(|name| allowlist.is_empty() || allowlist.contains(name))
            .collect();

        debug!(count = names.len(), "discovered tables");
        Ok(names)
    }

    fn read_table(&self, name: &str) -> crate::Result<Table> {
        let mut table = Table::new(name);
        let mut conn = self.conn()?;

        let columns: Vec<(String, String, String, Option<String>, String, Option<String>)> = conn
            .exec(
                "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT, EXTRA, COLUMN_COMMENT \
                 FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = :db AND TABLE_NAME = :table \
                 ORDER BY ORDINAL_POSITION",
                mysql::params! { "db" => &self.database, "table" => name },
            )?;

        for (col_name, col_type, nullable, default, extra, comment) in columns {
            table.columns.insert(
                col_name.clone(),
                Column {
                    name: col_name,
                    sql_type: col_type,
                    nullable: nullable.eq_ignore_ascii_case("YES"),
                    default,
                    auto_increment: extra.to_ascii_lowercase().contains("auto_increment"),
                    comment: comment.filter(|c| !c.is_empty()),
                },
            );
        }

        let pk_columns: Vec<String> = conn.exec(
            "SELECT COLUMN_NAME FROM information_schema.KEY_COLUMN_USAGE \
             WHERE TABLE_SCHEMA = :db AND TABLE_NAME = :table AND CONSTRAINT_NAME = 'PRIMARY' \
             ORDER BY ORDINAL_POSITION",
            mysql::params! { "db" => &self.database, "table" => name },
        )?;
        table.primary_keys = pk_columns;

        // Row-count estimation is best effort: a failure here warns but
        // does not fail the whole table read.
        let estimate: Option<(Option<u64>, Option<String>)> = conn
            .exec_first(
                "SELECT TABLE_ROWS, ENGINE FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = :db AND TABLE_NAME = :table",
                mysql::params! { "db" => &self.database, "table" => name },
            )
            .unwrap_or(None);
        if let Some((row_count, engine)) = estimate {
            table.row_count = row_count;
            table.engine = engine;
        } else {
            warn!(table = %name, "row count estimate unavailable");
        }

        Ok(table)
    }

    fn read_declared_foreign_keys(
        &self,
        snapshot: &SchemaSnapshot,
    ) -> crate::Result<Vec<ForeignKey>> {
        let mut conn = self.conn()?;
        let rows: Vec<(
            String,
            String,
            String,
            Option<String>,
            Option<String>,
            String,
            String,
        )> = conn.exec(
            "SELECT kcu.CONSTRAINT_NAME, kcu.TABLE_NAME, kcu.COLUMN_NAME, \
                    kcu.REFERENCED_TABLE_NAME, kcu.REFERENCED_COLUMN_NAME, \
                    rc.UPDATE_RULE, rc.DELETE_RULE \
             FROM information_schema.KEY_COLUMN_USAGE kcu \
             JOIN information_schema.REFERENTIAL_CONSTRAINTS rc \
               ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA \
              AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
             WHERE kcu.CONSTRAINT_SCHEMA = :db AND kcu.REFERENCED_TABLE_NAME IS NOT NULL",
            mysql::params! { "db" => &self.database },
        )?;

        let mut fks = Vec::new();
        for (constraint_name, from_table, from_column, to_table, to_column, update_rule, delete_rule) in rows
        {
            let (Some(to_table), Some(to_column)) = (to_table, to_column) else {
                continue;
            };
            if !snapshot.has_table(&from_table) || !snapshot.has_table(&to_table) {
                // Referenced table was excluded or failed to read; skip
                // rather than fail the whole declared-FK read.
                continue;
            }
            let mut fk = ForeignKey::declared(
                constraint_name,
                from_table,
                from_column,
                to_table,
                to_column,
            );
            fk.on_update = parse_referential_action(&update_rule);
            fk.on_delete = parse_referential_action(&delete_rule);
            fks.push(fk);
        }
        Ok(fks)
    }

    fn read_indexes(&self, snapshot: &SchemaSnapshot) -> crate::Result<Vec<Index>> {
        let mut conn = self.conn()?;
        let rows: Vec<(String, String, String, i8, String)> = conn.exec(
            "SELECT INDEX_NAME, TABLE_NAME, COLUMN_NAME, NON_UNIQUE, INDEX_TYPE \
             FROM information_schema.STATISTICS \
             WHERE TABLE_SCHEMA = :db \
             ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX",
            mysql::params! { "db" => &self.database },
        )?;

        let mut by_key: indexmap::IndexMap<(String, String), Index> = indexmap::IndexMap::new();
        for (index_name, table, column, non_unique, index_type) in rows {
            if !snapshot.has_table(&table) {
                continue;
            }
            let entry = by_key
                .entry((table.clone(), index_name.clone()))
                .or_insert_with(|| Index {
                    name: index_name,
                    table,
                    columns: Vec::new(),
                    unique: non_unique == 0,
                    kind: parse_index_kind(&index_type),
                });
            entry.columns.push(column);
        }

        Ok(by_key.into_values().collect())
    }
}

fn parse_referential_action(rule: &str) -> Option<ReferentialAction> {
    match rule.to_ascii_uppercase().as_str() {
        "CASCADE" => Some(ReferentialAction::Cascade),
        "SET NULL" => Some(ReferentialAction::SetNull),
        "RESTRICT" => Some(ReferentialAction::Restrict),
        "NO ACTION" => Some(ReferentialAction::NoAction),
        _ => None,
    }
}

fn parse_index_kind(index_type: &str) -> IndexKind {
    match index_type.to_ascii_uppercase().as_str() {
        "HASH" => IndexKind::Hash,
        "FULLTEXT" => IndexKind::FullText,
        "SPATIAL" => IndexKind::Spatial,
        _ => IndexKind::BTree,
    }
}
