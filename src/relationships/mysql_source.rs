// src/relationships/mysql_source.rs

//! The live MySQL-backed `ValueSource` used outside of tests.

use crate::relationships::sampling::ValueSource;
use mysql::prelude::*;
use mysql::{Params, Pool, Value as MysqlValue};

pub struct MySqlValueSource {
    pool: Pool,
}

impl MySqlValueSource {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl ValueSource for MySqlValueSource {
    fn sample_distinct_values(
        &mut self,
        table: &str,
        column: &str,
        limit: usize,
    ) -> crate::Result<Vec<String>> {
        let mut conn = self.pool.get_conn()?;
        let query = format!(
            "SELECT DISTINCT `{column}` FROM `{table}` WHERE `{column}` IS NOT NULL LIMIT {limit}"
        );
        let rows: Vec<String> = conn.query(query)?;
        Ok(rows)
    }

    fn matching_count(
        &mut self,
        target_table: &str,
        target_column: &str,
        values: &[String],
    ) -> crate::Result<usize> {
        if values.is_empty() {
            return Ok(0);
        }
        let mut conn = self.pool.get_conn()?;
        let placeholders = values.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            "SELECT COUNT(DISTINCT `{target_column}`) FROM `{target_table}` WHERE `{target_column}` IN ({placeholders})"
        );
        let params: Vec<MysqlValue> = values.iter().map(|v| v.clone().into()).collect();
        let count: Option<u64> = conn.exec_first(query, Params::Positional(params))?;
        Ok(count.unwrap_or(0) as usize)
    }
}
