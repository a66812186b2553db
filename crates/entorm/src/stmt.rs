//! Statement compilation.
//!
//! [`Statement::build`] turns a [`ClauseBuilder`] and an [`EntityMeta`] into
//! SQL text plus positional bindings for one [`OperationKind`].
//!
//! Fallback rules when no predicate was given:
//!
//! | kind   | primary key present   | no primary key            |
//! |--------|-----------------------|---------------------------|
//! | UPDATE | `WHERE pk = ?`        | build error               |
//! | DELETE | `WHERE pk = ?`        | unconditional `DELETE`    |
//!
//! Column and table names are interpolated, not bound. They must come from
//! entity metadata or trusted code, never from user input.

use crate::builder::{ClauseBuilder, Pagination, Predicate};
use crate::dialect::Dialect;
use crate::entity::EntityMeta;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// The kind of statement to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
    /// `SELECT count(*)` over the same predicates as a SELECT.
    Count,
}

/// A compiled statement.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    dialect: Dialect,
    op: Option<OperationKind>,
    sql: String,
    bindings: Vec<Value>,
    returns_key: bool,
}

impl Statement {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn set_op(&mut self, op: OperationKind) -> &mut Self {
        self.op = Some(op);
        self
    }

    pub fn op(&self) -> Option<OperationKind> {
        self.op
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Compile the current operation.
    ///
    /// On error the previous SQL and bindings are cleared and nothing is
    /// produced.
    pub fn build(&mut self, builder: &ClauseBuilder, meta: &EntityMeta) -> OrmResult<()> {
        self.sql.clear();
        self.bindings.clear();
        self.returns_key = false;

        let op = self.op.ok_or(OrmError::UndefinedOperation)?;
        let mut w = SqlWriter::new(self.dialect);
        match op {
            OperationKind::Select => build_select(&mut w, builder, meta),
            OperationKind::Count => build_count(&mut w, builder, meta),
            OperationKind::Update => build_update(&mut w, builder, meta)?,
            OperationKind::Insert => {
                self.returns_key = build_insert(&mut w, meta);
            }
            OperationKind::Delete => build_delete(&mut w, builder, meta)?,
        }
        w.push(";");

        self.sql = w.sql;
        self.bindings = w.bindings;
        Ok(())
    }

    /// Generated SQL; empty until a successful build.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bindings in placeholder order.
    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    /// Whether the statement yields the generated key as a result row.
    pub fn returns_key(&self) -> bool {
        self.returns_key
    }

    /// Forget the operation, SQL and bindings.
    pub fn reset(&mut self) {
        self.op = None;
        self.sql.clear();
        self.bindings.clear();
        self.returns_key = false;
    }
}

/// SQL text with placeholders numbered as values are bound.
struct SqlWriter {
    dialect: Dialect,
    sql: String,
    bindings: Vec<Value>,
}

impl SqlWriter {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::with_capacity(128),
            bindings: Vec::new(),
        }
    }

    fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    fn push_ident(&mut self, ident: &str) -> &mut Self {
        let quoted = self.dialect.quote(ident);
        self.push(&quoted)
    }

    fn push_bind(&mut self, value: Value) -> &mut Self {
        self.bindings.push(value);
        let placeholder = self.dialect.placeholder(self.bindings.len());
        self.push(&placeholder)
    }

    fn push_predicates(&mut self, predicates: &[Predicate]) {
        if predicates.is_empty() {
            return;
        }
        self.push(" WHERE ");
        for (i, p) in predicates.iter().enumerate() {
            if i > 0 {
                self.push(" AND ");
            }
            self.push_ident(&p.field)
                .push(" ")
                .push(p.operator.as_sql())
                .push(" ")
                .push_bind(p.value.clone());
        }
    }

    /// Explicit predicates, else `WHERE pk = ?`. Returns false when neither
    /// is available.
    fn push_where_or_pk(&mut self, builder: &ClauseBuilder, meta: &EntityMeta) -> OrmResult<bool> {
        if !builder.predicates().is_empty() {
            self.push_predicates(builder.predicates());
            return Ok(true);
        }
        let Some(pk) = meta.primary_key() else {
            return Ok(false);
        };
        let value = pk.binding().ok_or_else(|| {
            OrmError::build(format!("primary key `{}` has no value", pk.column))
        })?;
        self.push(" WHERE ")
            .push_ident(&pk.column)
            .push(" = ")
            .push_bind(value);
        Ok(true)
    }
}

fn build_select(w: &mut SqlWriter, builder: &ClauseBuilder, meta: &EntityMeta) {
    w.push("SELECT ");
    if builder.fields().is_empty() {
        w.push("*");
    } else {
        for (i, f) in builder.fields().iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_ident(f);
        }
    }
    w.push(" FROM ").push_ident(meta.table());
    w.push_predicates(builder.predicates());

    for (i, order) in builder.orders().iter().enumerate() {
        w.push(if i == 0 { " ORDER BY " } else { ", " });
        w.push_ident(&order.field)
            .push(" ")
            .push(order.direction.as_sql());
    }

    match builder.pagination() {
        Pagination::Unbounded => {}
        Pagination::FetchOne => {
            w.push(" LIMIT 1");
        }
        page @ Pagination::Page { .. } => {
            if let Some((limit, offset)) = page.limit_offset() {
                w.push(&format!(" LIMIT {limit} OFFSET {offset}"));
            }
        }
    }
}

fn build_count(w: &mut SqlWriter, builder: &ClauseBuilder, meta: &EntityMeta) {
    w.push("SELECT count(*) AS paginate FROM ")
        .push_ident(meta.table());
    w.push_predicates(builder.predicates());
}

fn build_update(w: &mut SqlWriter, builder: &ClauseBuilder, meta: &EntityMeta) -> OrmResult<()> {
    if builder.update_fields().is_empty() {
        return Err(OrmError::Update("no fields to update".to_string()));
    }

    w.push("UPDATE ").push_ident(meta.table()).push(" SET ");
    let mut assigned = 0usize;
    for name in builder.update_fields() {
        let Some(field) = meta.field(name) else {
            continue;
        };
        let Some(value) = field.binding() else {
            continue;
        };
        if assigned > 0 {
            w.push(", ");
        }
        w.push_ident(&field.column).push(" = ").push_bind(value);
        assigned += 1;
    }
    if assigned == 0 {
        return Err(OrmError::build(format!(
            "none of the update fields {:?} can be assigned on `{}`",
            builder.update_fields(),
            meta.table()
        )));
    }

    if !w.push_where_or_pk(builder, meta)? {
        return Err(OrmError::build(format!(
            "UPDATE on `{}` has neither a condition nor a primary key",
            meta.table()
        )));
    }
    Ok(())
}

/// Returns whether a `RETURNING` clause was emitted.
fn build_insert(w: &mut SqlWriter, meta: &EntityMeta) -> bool {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for field in meta.fields() {
        if field.is_auto_generated {
            continue;
        }
        if let Some(value) = field.binding() {
            columns.push(field.column.as_str());
            values.push(value);
        }
    }

    w.push("INSERT INTO ").push_ident(meta.table());
    let dialect = w.dialect;
    if columns.is_empty() {
        match dialect {
            Dialect::MySql => w.push(" () VALUES ()"),
            Dialect::Postgres => w.push(" DEFAULT VALUES"),
        };
    } else {
        w.push(" (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_ident(column);
        }
        w.push(") VALUES (");
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_bind(value);
        }
        w.push(")");
    }

    match meta.primary_key() {
        Some(pk) if pk.is_auto_generated && dialect.returns_generated_key() => {
            w.push(" RETURNING ").push_ident(&pk.column);
            true
        }
        _ => false,
    }
}

fn build_delete(w: &mut SqlWriter, builder: &ClauseBuilder, meta: &EntityMeta) -> OrmResult<()> {
    w.push("DELETE FROM ").push_ident(meta.table());
    if !w.push_where_or_pk(builder, meta)? {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            target: "entorm.sql",
            table = meta.table(),
            "DELETE without condition or primary key removes every row"
        );
    }
    Ok(())
}
