//! Executor traits connecting compiled statements to a database driver.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::value::Value;

/// One result row as reported by a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl RawRow {
    /// Pair column names with values. Columns without a value read as absent.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value of the named column, if present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }
}

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Key generated by an INSERT, when the driver reports one.
    pub last_insert_id: Option<i64>,
}

/// A forward-only stream of result rows.
///
/// Holding a row source keeps the underlying result stream open. Dropping it
/// or calling [`RowSource::close`] releases it.
pub trait RowSource: Send {
    /// Pull the next row; `Ok(None)` once the stream is exhausted.
    fn next_row(&mut self) -> impl Future<Output = OrmResult<Option<RawRow>>> + Send;

    /// Release the underlying stream. Further calls to `next_row` yield `None`.
    fn close(&mut self);
}

/// A database handle able to run compiled statements.
///
/// Implemented for [`PgExecutor`](crate::postgres::PgExecutor) and for
/// shared references, so one executor can back many models.
pub trait Executor: Send + Sync {
    type Rows: RowSource;

    /// Dialect statements must be compiled for.
    fn dialect(&self) -> Dialect;

    /// Run a statement and stream its rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Self::Rows>> + Send;

    /// Run a statement that does not return rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<ExecResult>> + Send;
}

impl<T: Executor> Executor for &T {
    type Rows = T::Rows;

    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Self::Rows>> + Send {
        (**self).query(sql, params)
    }

    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<ExecResult>> + Send {
        (**self).execute(sql, params)
    }
}

impl<T: Executor> Executor for Arc<T> {
    type Rows = T::Rows;

    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Self::Rows>> + Send {
        (**self).query(sql, params)
    }

    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<ExecResult>> + Send {
        (**self).execute(sql, params)
    }
}

/// A row source over rows that are already in memory.
#[derive(Debug, Default)]
pub struct VecRows {
    rows: VecDeque<RawRow>,
    closed: bool,
}

impl VecRows {
    pub fn new(rows: impl IntoIterator<Item = RawRow>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RowSource for VecRows {
    async fn next_row(&mut self) -> OrmResult<Option<RawRow>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        self.closed = true;
        self.rows.clear();
    }
}
