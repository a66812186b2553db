//! Clause accumulation for one logical operation.
//!
//! [`ClauseBuilder`] only records what the caller asked for, in call order.
//! Interpretation happens in the statement compiler.

use crate::value::Value;

/// Page size used when none was given.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
        }
    }
}

/// One `field operator value` filter; siblings are AND-joined.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub direction: Direction,
    pub field: String,
}

/// Row limit of a SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pagination {
    /// No LIMIT clause.
    #[default]
    Unbounded,
    /// `LIMIT 1`, used by single-row retrieval.
    FetchOne,
    /// 1-based page index and page size.
    Page { page: u64, size: u64 },
}

impl Pagination {
    /// Interpret a `(page, size)` pair.
    ///
    /// A zero page means no limit; a non-zero page with a zero size means
    /// fetch a single row; anything else is a regular page.
    pub fn from_pair(page: u64, size: u64) -> Self {
        match (page, size) {
            (0, _) => Pagination::Unbounded,
            (_, 0) => Pagination::FetchOne,
            (page, size) => Pagination::Page { page, size },
        }
    }

    /// `(limit, offset)` for a page; `None` otherwise.
    pub fn limit_offset(self) -> Option<(u64, u64)> {
        match self {
            Pagination::Page { page, size } => Some((size, size.saturating_mul(page.saturating_sub(1)))),
            _ => None,
        }
    }
}

/// Accumulated clause state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseBuilder {
    fields: Vec<String>,
    predicates: Vec<Predicate>,
    orders: Vec<OrderClause>,
    update_fields: Vec<String>,
    pagination: Pagination,
}

impl ClauseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selected columns. Empty means `*`.
    pub fn select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Append a predicate.
    pub fn where_condition(
        &mut self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.predicates.push(Predicate {
            field: field.into(),
            operator,
            value: value.into(),
        });
        self
    }

    /// Append an ascending sort.
    pub fn order_by(&mut self, field: impl Into<String>) -> &mut Self {
        self.orders.push(OrderClause {
            direction: Direction::Asc,
            field: field.into(),
        });
        self
    }

    /// Append a descending sort.
    pub fn order_by_desc(&mut self, field: impl Into<String>) -> &mut Self {
        self.orders.push(OrderClause {
            direction: Direction::Desc,
            field: field.into(),
        });
        self
    }

    /// Set the columns an UPDATE assigns.
    pub fn update<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Limit the SELECT to a single row.
    pub fn fetch_one(&mut self) -> &mut Self {
        self.pagination = Pagination::FetchOne;
        self
    }

    /// Limit the SELECT to one page; see [`Pagination::from_pair`].
    pub fn paginate(&mut self, page: u64, size: u64) -> &mut Self {
        self.pagination = Pagination::from_pair(page, size);
        self
    }

    /// [`ClauseBuilder::paginate`] with [`DEFAULT_PAGE_SIZE`].
    pub fn page(&mut self, page: u64) -> &mut Self {
        self.paginate(page, DEFAULT_PAGE_SIZE)
    }

    /// Restore every clause to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn orders(&self) -> &[OrderClause] {
        &self.orders
    }

    pub fn update_fields(&self) -> &[String] {
        &self.update_fields
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }
}
