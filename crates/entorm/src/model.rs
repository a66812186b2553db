//! The fluent model API.
//!
//! A [`Model`] owns one entity, its extracted metadata, the clause state of
//! the operation being built and the injected executor. Builder calls
//! accumulate clauses; terminal calls (`first`, `get`, `paginate`, `insert`,
//! `update`, `delete`, `build`) compile, run and then reset the clause state so
//! the model can be reused for the next operation.
//!
//! ```ignore
//! use entorm::{Entity, Model};
//!
//! #[derive(Debug, Default, Entity)]
//! pub struct User {
//!     #[orm(tag = "autoPk")]
//!     pub id: i64,
//!     pub name: String,
//!     pub age: i32,
//! }
//!
//! let mut users = Model::new(&executor, User::default())?;
//! let adults = users.gte("age", 18).order_by_desc("id").paginate(1, 20).await?;
//! println!("{} adults", adults.total());
//! ```

use std::sync::Arc;

use crate::builder::{ClauseBuilder, DEFAULT_PAGE_SIZE, Operator};
use crate::client::{ExecResult, Executor, RowSource};
use crate::cursor::Cursor;
use crate::entity::{Entity, EntityMeta};
use crate::error::OrmResult;
use crate::stmt::{OperationKind, Statement};
use crate::value::Value;

/// Entity-bound query builder and executor.
pub struct Model<E, C> {
    executor: C,
    entity: E,
    meta: Arc<EntityMeta>,
    builder: ClauseBuilder,
    stmt: Statement,
}

impl<E: Entity, C: Executor> Model<E, C> {
    /// Extract metadata from `entity` and bind it to `executor`.
    ///
    /// Fails with [`OrmError::EntityShape`](crate::OrmError::EntityShape) when
    /// the entity cannot be mapped.
    pub fn new(executor: C, entity: E) -> OrmResult<Self> {
        let meta = EntityMeta::extract(&entity)?;
        let stmt = Statement::new(executor.dialect());
        Ok(Self {
            executor,
            entity,
            meta: Arc::new(meta),
            builder: ClauseBuilder::new(),
            stmt,
        })
    }

    pub fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    /// Mutable access to the entity; insert, update and delete use its
    /// current values.
    pub fn entity_mut(&mut self) -> &mut E {
        &mut self.entity
    }

    pub fn into_entity(self) -> E {
        self.entity
    }

    pub fn executor(&self) -> &C {
        &self.executor
    }

    /// Clause state of the operation being built.
    pub fn clauses(&self) -> &ClauseBuilder {
        &self.builder
    }

    /// The last compiled statement; empty after a terminal call.
    pub fn statement(&self) -> &Statement {
        &self.stmt
    }

    // ==================== Clauses ====================

    /// Select only these columns. Empty selects `*`.
    pub fn select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builder.select(fields);
        self
    }

    pub fn where_condition(
        &mut self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.builder.where_condition(field, operator, value);
        self
    }

    /// `field = value`
    pub fn eq(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.where_condition(field, Operator::Eq, value)
    }

    /// `field != value`
    pub fn neq(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.where_condition(field, Operator::Ne, value)
    }

    /// `field < value`
    pub fn lt(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.where_condition(field, Operator::Lt, value)
    }

    /// `field <= value`
    pub fn lte(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.where_condition(field, Operator::Lte, value)
    }

    /// `field > value`
    pub fn gt(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.where_condition(field, Operator::Gt, value)
    }

    /// `field >= value`
    pub fn gte(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.where_condition(field, Operator::Gte, value)
    }

    /// `field LIKE pattern`
    pub fn like(&mut self, field: impl Into<String>, pattern: impl Into<Value>) -> &mut Self {
        self.where_condition(field, Operator::Like, pattern)
    }

    pub fn order_by(&mut self, field: impl Into<String>) -> &mut Self {
        self.builder.order_by(field);
        self
    }

    pub fn order_by_desc(&mut self, field: impl Into<String>) -> &mut Self {
        self.builder.order_by_desc(field);
        self
    }

    /// Name the columns an UPDATE assigns from the entity's current values.
    pub fn update_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builder.update(fields);
        self
    }

    /// Restore default clause state and clear the compiled statement.
    pub fn reset(&mut self) {
        self.builder.reset();
        self.stmt.reset();
    }

    // ==================== Terminals ====================

    /// Fetch the first matching row.
    pub async fn first(&mut self) -> OrmResult<Option<E>> {
        self.builder.fetch_one();
        let result = self.fetch(OperationKind::Select).await;
        self.reset();

        let mut cursor = result?;
        cursor.current().await;
        let entity = cursor.take_current();
        cursor.close();
        match cursor.take_error() {
            Some(e) => Err(e),
            None => Ok(entity),
        }
    }

    /// Fetch every matching row through a cursor.
    pub async fn get(&mut self) -> OrmResult<Cursor<E, C::Rows>> {
        let result = self.fetch(OperationKind::Select).await;
        self.reset();
        result
    }

    /// Fetch one page of matching rows. [`Cursor::total`] reports the number
    /// of rows matching the predicates across all pages.
    ///
    /// `page` is 1-based. A zero `page` fetches everything and a zero `size`
    /// fetches a single row.
    pub async fn paginate(&mut self, page: u64, size: u64) -> OrmResult<Cursor<E, C::Rows>> {
        self.builder.paginate(page, size);
        let result = self.fetch_page().await;
        self.reset();
        result
    }

    /// [`Model::paginate`] with the default page size of
    /// [`DEFAULT_PAGE_SIZE`] rows.
    pub async fn page(&mut self, page: u64) -> OrmResult<Cursor<E, C::Rows>> {
        self.paginate(page, DEFAULT_PAGE_SIZE).await
    }

    /// Insert the entity and return the generated key (0 when the driver
    /// reports none).
    pub async fn insert(&mut self) -> OrmResult<i64> {
        let result = self.insert_entity().await;
        self.reset();
        result
    }

    /// Update the named columns from the entity's current values.
    ///
    /// Without explicit predicates the primary key selects the row.
    pub async fn update<I, S>(&mut self, fields: I) -> OrmResult<u64>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_fields(fields);
        let result = self.execute(OperationKind::Update).await;
        self.reset();
        result.map(|r| r.rows_affected)
    }

    /// Delete matching rows.
    ///
    /// Without explicit predicates the primary key selects the row; an entity
    /// without a primary key deletes the whole table.
    pub async fn delete(&mut self) -> OrmResult<u64> {
        let result = self.execute(OperationKind::Delete).await;
        self.reset();
        result.map(|r| r.rows_affected)
    }

    /// Compile the current clauses without running them.
    pub fn build(&mut self, op: OperationKind) -> OrmResult<Statement> {
        let result = self.compile(op).map(|()| self.stmt.clone());
        self.reset();
        result
    }

    // ==================== Raw SQL ====================

    /// Run raw SQL and stream its rows.
    pub async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<C::Rows> {
        self.executor.query(sql, params).await
    }

    /// Run raw SQL that returns no rows.
    pub async fn exec(&self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        self.executor.execute(sql, params).await
    }

    /// Run raw SQL and map its rows into this model's entity type.
    ///
    /// Result columns are matched by name, so aliases can feed projections:
    /// `SELECT name AS user_name, count(*) AS total FROM user GROUP BY name`.
    pub async fn query_cursor(
        &self,
        sql: &str,
        params: &[Value],
    ) -> OrmResult<Cursor<E, C::Rows>> {
        let rows = self.executor.query(sql, params).await?;
        Ok(Cursor::new(rows, Arc::clone(&self.meta)))
    }

    // ==================== Internals ====================

    fn compile(&mut self, op: OperationKind) -> OrmResult<()> {
        if matches!(
            op,
            OperationKind::Insert | OperationKind::Update | OperationKind::Delete
        ) {
            Arc::make_mut(&mut self.meta).refresh_values(self.entity.values());
        }
        self.stmt.set_op(op);
        self.stmt.build(&self.builder, &self.meta)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "entorm.sql",
            op = ?op,
            table = self.meta.table(),
            param_count = self.stmt.bindings().len(),
            sql = %truncate_sql(self.stmt.sql(), 200),
        );
        Ok(())
    }

    async fn fetch(&mut self, op: OperationKind) -> OrmResult<Cursor<E, C::Rows>> {
        self.compile(op)?;
        let rows = self
            .executor
            .query(self.stmt.sql(), self.stmt.bindings())
            .await?;
        Ok(Cursor::new(rows, Arc::clone(&self.meta)))
    }

    async fn execute(&mut self, op: OperationKind) -> OrmResult<ExecResult> {
        self.compile(op)?;
        self.executor
            .execute(self.stmt.sql(), self.stmt.bindings())
            .await
    }

    /// Runs the count before the page so only one result stream is open at a
    /// time on the connection.
    async fn fetch_page(&mut self) -> OrmResult<Cursor<E, C::Rows>> {
        self.compile(OperationKind::Count)?;
        let total = self.first_integer().await?;

        let mut cursor = self.fetch(OperationKind::Select).await?;
        cursor.set_total(u64::try_from(total).unwrap_or(0));
        Ok(cursor)
    }

    async fn insert_entity(&mut self) -> OrmResult<i64> {
        self.compile(OperationKind::Insert)?;
        if self.stmt.returns_key() {
            return self.first_integer().await;
        }
        let result = self
            .executor
            .execute(self.stmt.sql(), self.stmt.bindings())
            .await?;
        Ok(result.last_insert_id.unwrap_or(0))
    }

    /// First column of the first row of the compiled statement, as an integer.
    async fn first_integer(&self) -> OrmResult<i64> {
        let mut rows = self
            .executor
            .query(self.stmt.sql(), self.stmt.bindings())
            .await?;
        let row = rows.next_row().await;
        rows.close();
        Ok(row?
            .and_then(|r| r.values().first().and_then(Value::as_i64))
            .unwrap_or(0))
    }
}

#[cfg(feature = "tracing")]
fn truncate_sql(sql: &str, max: usize) -> std::borrow::Cow<'_, str> {
    if sql.len() <= max {
        return std::borrow::Cow::Borrowed(sql);
    }
    let mut end = max;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    std::borrow::Cow::Owned(format!("{}...", &sql[..end]))
}
