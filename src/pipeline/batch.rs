// src/pipeline/batch.rs

//! C5 Batch Reader — turns a table's row count into fixed-size,
//! offset-windowed job descriptors, and executes a single window against
//! MySQL.

use crate::pipeline::emitter::RowRecord;
use crate::schema::model::Table;
use mysql::prelude::*;
use mysql::{Pool, Value};

/// One `LIMIT`/`OFFSET` window over a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub table: String,
    pub offset: u64,
    pub limit: u64,
}

/// Split `row_count` rows into `ceil(row_count / batch_size)` windows. An
/// empty table yields no jobs at all.
pub fn plan_jobs(table_name: &str, row_count: u64, batch_size: u64) -> Vec<BatchJob> {
    if row_count == 0 || batch_size == 0 {
        return Vec::new();
    }
    let window_count = row_count.div_ceil(batch_size);
    (0..window_count)
        .map(|i| BatchJob {
            table: table_name.to_string(),
            offset: i * batch_size,
            limit: batch_size,
        })
        .collect()
}

pub struct BatchReader {
    pool: Pool,
}

impl BatchReader {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// `SELECT COUNT(*)` for a table, used to plan the job windows.
    pub fn row_count(&self, table_name: &str) -> crate::Result<u64> {
        let mut conn = self.pool.get_conn()?;
        let query = format!("SELECT COUNT(*) FROM `{table_name}`");
        let count: Option<u64> = conn.query_first(query)?;
        Ok(count.unwrap_or(0))
    }

    /// Fetch one window of rows, ordered by primary key (or the table's
    /// first column when no primary key is declared) so repeated runs
    /// over unchanged data produce stable windows.
    pub fn fetch_batch(&self, table: &Table, job: &BatchJob) -> crate::Result<Vec<RowRecord>> {
        let column_names: Vec<&str> = table.columns.keys().map(|s| s.as_str()).collect();
        let order_column = table
            .primary_keys
            .first()
            .map(|s| s.as_str())
            .or_else(|| column_names.first().copied());

        let select_list = column_names
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut query = format!("SELECT {select_list} FROM `{}`", table.name);
        if let Some(order_column) = order_column {
            query.push_str(&format!(" ORDER BY `{order_column}`"));
        }
        query.push_str(" LIMIT ? OFFSET ?");

        let mut conn = self.pool.get_conn()?;
        let result = conn.exec_iter(query, (job.limit, job.offset))?;

        let mut rows = Vec::new();
        for row in result {
            let row = row?;
            let columns: Vec<String> = row
                .columns_ref()
                .iter()
                .map(|c| c.name_str().to_string())
                .collect();
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value = row.as_ref(i).cloned().unwrap_or(Value::NULL);
                values.push(value_to_raw(value));
            }
            rows.push(RowRecord { columns, values });
        }
        Ok(rows)
    }
}

fn value_to_raw(value: Value) -> crate::pipeline::emitter::RawValue {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(bytes),
        Value::Int(i) => Some(i.to_string().into_bytes()),
        Value::UInt(u) => Some(u.to_string().into_bytes()),
        Value::Float(f) => Some(f.to_string().into_bytes()),
        Value::Double(d) => Some(d.to_string().into_bytes()),
        Value::Date(year, month, day, hour, minute, second, micro) => Some(
            format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micro:06}")
                .into_bytes(),
        ),
        Value::Time(negative, days, hours, minutes, seconds, micro) => {
            let sign = if negative { "-" } else { "" };
            Some(format!("{sign}{days}d{hours:02}:{minutes:02}:{seconds:02}.{micro:06}").into_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_jobs_splits_evenly() {
        let jobs = plan_jobs("authors", 250, 100);
        assert_eq!(
            jobs,
            vec![
                BatchJob { table: "authors".to_string(), offset: 0, limit: 100 },
                BatchJob { table: "authors".to_string(), offset: 100, limit: 100 },
                BatchJob { table: "authors".to_string(), offset: 200, limit: 100 },
            ]
        );
    }

    #[test]
    fn plan_jobs_handles_a_partial_final_window() {
        let jobs = plan_jobs("authors", 201, 100);
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[2].offset, 200);
        // the job's own limit is the fixed window size; the reader simply
        // gets fewer rows back than requested for the trailing window.
        assert_eq!(jobs[2].limit, 100);
    }

    #[test]
    fn plan_jobs_on_an_empty_table_yields_nothing() {
        assert!(plan_jobs("authors", 0, 100).is_empty());
    }

    #[test]
    fn value_conversion_treats_sql_null_as_none() {
        assert_eq!(value_to_raw(Value::NULL), None);
    }

    #[test]
    fn value_conversion_stringifies_integers() {
        assert_eq!(value_to_raw(Value::Int(-7)), Some(b"-7".to_vec()));
        assert_eq!(value_to_raw(Value::UInt(7)), Some(b"7".to_vec()));
    }
}
