#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use entorm::{Dialect, ExecResult, Executor, OrmResult, RawRow, Value, VecRows};

/// One statement handed to the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub sql: String,
    pub params: Vec<Value>,
}

/// In-memory executor recording every statement and replaying canned results.
///
/// Queries pop the next queued row set (empty when none is queued); executes
/// pop the next queued [`ExecResult`] (default when none is queued).
#[derive(Default)]
pub struct MockExecutor {
    dialect: Dialect,
    log: Mutex<Vec<Recorded>>,
    rows: Mutex<VecDeque<Vec<RawRow>>>,
    results: Mutex<VecDeque<ExecResult>>,
}

impl MockExecutor {
    pub fn mysql() -> Self {
        Self::default()
    }

    pub fn postgres() -> Self {
        Self {
            dialect: Dialect::Postgres,
            ..Self::default()
        }
    }

    pub fn push_rows(&self, rows: Vec<RawRow>) {
        self.rows.lock().unwrap().push_back(rows);
    }

    pub fn push_result(&self, rows_affected: u64, last_insert_id: Option<i64>) {
        self.results.lock().unwrap().push_back(ExecResult {
            rows_affected,
            last_insert_id,
        });
    }

    pub fn statements(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn sqls(&self) -> Vec<String> {
        self.statements().into_iter().map(|r| r.sql).collect()
    }

    pub fn last(&self) -> Recorded {
        self.log
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no statement recorded")
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.log.lock().unwrap().push(Recorded {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }
}

impl Executor for MockExecutor {
    type Rows = VecRows;

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<VecRows> {
        self.record(sql, params);
        let rows = self.rows.lock().unwrap().pop_front().unwrap_or_default();
        Ok(VecRows::new(rows))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        self.record(sql, params);
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Build a row from column names and values.
pub fn row(columns: &[&str], values: Vec<Value>) -> RawRow {
    let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
    RawRow::new(columns, values)
}

/// Render a value the way a text-protocol driver reports it.
pub fn as_text(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Text(s) => Value::Text(s.clone()),
        Value::Int(i) => Value::Text(i.to_string()),
        Value::UInt(u) => Value::Text(u.to_string()),
        Value::Bool(b) => Value::Text(if *b { "1" } else { "0" }.to_string()),
        Value::Float(f) => Value::Text(f.to_string()),
        Value::Temporal(dt) => Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}
