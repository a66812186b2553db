//! Lazy row-to-entity mapping.

use std::sync::Arc;

use crate::client::{RawRow, RowSource};
use crate::entity::{Entity, EntityMeta};
use crate::error::{OrmError, OrmResult};
use crate::value::{SemanticType, TemporalKind};

/// Forward-only cursor mapping each row into a new `E`.
///
/// # Example
///
/// ```ignore
/// let mut users = model.eq("name", "tom").get().await?;
/// while users.advance().await {
///     let user = users.take_current();
///     // ...
/// }
/// if let Some(err) = users.error() {
///     return Err(err);
/// }
/// ```
#[must_use]
pub struct Cursor<E, R> {
    rows: Option<R>,
    meta: Arc<EntityMeta>,
    plan: Option<ScanPlan>,
    current: Option<E>,
    consumed: bool,
    error: Option<OrmError>,
    total: u64,
}

impl<E: Entity, R: RowSource> Cursor<E, R> {
    pub fn new(rows: R, meta: Arc<EntityMeta>) -> Self {
        Self {
            rows: Some(rows),
            meta,
            plan: None,
            current: None,
            consumed: false,
            error: None,
            total: 0,
        }
    }

    /// Map the next row. Returns false once the rows are exhausted or an
    /// error occurred; in both cases the row source is released.
    pub async fn advance(&mut self) -> bool {
        self.consumed = true;
        let next = match self.rows.as_mut() {
            Some(rows) => rows.next_row().await,
            None => return false,
        };
        match next {
            Ok(Some(row)) => match self.map_row(row) {
                Ok(entity) => {
                    self.current = Some(entity);
                    true
                }
                Err(e) => {
                    self.fail(e);
                    false
                }
            },
            Ok(None) => {
                self.close();
                false
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    /// The most recently mapped entity, advancing first if no row has been
    /// read yet.
    pub async fn current(&mut self) -> Option<&E> {
        if !self.consumed {
            self.advance().await;
        }
        self.current.as_ref()
    }

    /// Take ownership of the most recently mapped entity.
    pub fn take_current(&mut self) -> Option<E> {
        self.current.take()
    }

    /// Mapping or source error hit by [`Cursor::advance`].
    pub fn error(&self) -> Option<&OrmError> {
        self.error.as_ref()
    }

    /// Take the error, leaving `None` behind.
    pub fn take_error(&mut self) -> Option<OrmError> {
        self.error.take()
    }

    /// Total matching rows; only set by paginated retrieval.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub(crate) fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    /// Release the row source early.
    pub fn close(&mut self) {
        if let Some(mut rows) = self.rows.take() {
            rows.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.rows.is_none()
    }

    /// Drain the cursor, including a mapped entity not yet taken.
    pub async fn into_vec(mut self) -> OrmResult<Vec<E>> {
        let mut out: Vec<E> = self.current.take().into_iter().collect();
        while self.advance().await {
            out.extend(self.current.take());
        }
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(out),
        }
    }

    fn fail(&mut self, err: OrmError) {
        #[cfg(feature = "tracing")]
        tracing::warn!(target: "entorm.sql", error = %err, table = self.meta.table(), "row scan failed");
        self.current = None;
        self.error = Some(err);
        self.close();
    }

    fn map_row(&mut self, row: RawRow) -> OrmResult<E> {
        let plan = match self.plan.take() {
            Some(plan) if plan.matches(row.columns()) => plan,
            _ => ScanPlan::resolve(&self.meta, row.columns()),
        };
        let entity = plan.map(row);
        self.plan = Some(plan);
        entity
    }
}

/// Scan destination for one result column.
#[derive(Debug, Clone, Copy)]
struct ScanSlot {
    attribute: &'static str,
    semantic: SemanticType,
    temporal: TemporalKind,
}

/// Column-to-field resolution for one result shape.
#[derive(Debug)]
struct ScanPlan {
    columns: Arc<[String]>,
    slots: Vec<Option<ScanSlot>>,
}

impl ScanPlan {
    fn resolve(meta: &EntityMeta, columns: &Arc<[String]>) -> Self {
        let slots = columns
            .iter()
            .map(|column| {
                meta.field(column).map(|f| ScanSlot {
                    attribute: f.attribute,
                    semantic: f.semantic,
                    temporal: f.temporal,
                })
            })
            .collect();
        Self {
            columns: Arc::clone(columns),
            slots,
        }
    }

    fn matches(&self, columns: &Arc<[String]>) -> bool {
        Arc::ptr_eq(&self.columns, columns) || self.columns[..] == columns[..]
    }

    fn map<E: Entity>(&self, row: RawRow) -> OrmResult<E> {
        let mut entity = E::default();
        for ((slot, column), raw) in self
            .slots
            .iter()
            .zip(self.columns.iter())
            .zip(row.into_values())
        {
            // unmatched columns are read and dropped
            let Some(slot) = slot else {
                continue;
            };
            let value = slot
                .semantic
                .scan(raw, slot.temporal)
                .map_err(|message| OrmError::decode(column.as_str(), message))?;
            entity.assign(slot.attribute, value)?;
        }
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::VecRows;
    use crate::entity::{AttributeShape, EntityShape, ShapeKind};
    use crate::value::{FieldValue, Value};
    use chrono::NaiveDate;

    #[derive(Debug, Default, PartialEq)]
    struct Event {
        id: i64,
        title: String,
        day: Option<NaiveDate>,
    }

    impl Entity for Event {
        fn shape() -> EntityShape {
            let attr = |name: &'static str, semantic: SemanticType, tag: Option<&'static str>| {
                AttributeShape {
                    name,
                    type_name: "test",
                    semantic: Some(semantic),
                    public: true,
                    tag,
                }
            };
            EntityShape {
                name: "Event",
                kind: ShapeKind::Struct,
                attributes: vec![
                    attr("id", SemanticType::SignedInt, Some("autoPk")),
                    attr("title", SemanticType::String, None),
                    attr("day", SemanticType::Temporal, Some("date")),
                ],
            }
        }

        fn values(&self) -> Vec<Value> {
            vec![self.id.to_value(), self.title.to_value(), self.day.to_value()]
        }

        fn assign(&mut self, attribute: &str, value: Value) -> OrmResult<()> {
            let wrap = |m: String| OrmError::decode(attribute, m);
            match attribute {
                "id" => self.id = FieldValue::from_value(value).map_err(wrap)?,
                "title" => self.title = FieldValue::from_value(value).map_err(wrap)?,
                "day" => self.day = FieldValue::from_value(value).map_err(wrap)?,
                _ => {}
            }
            Ok(())
        }
    }

    fn columns(names: &[&str]) -> Arc<[String]> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn cursor(rows: Vec<RawRow>) -> Cursor<Event, VecRows> {
        let meta = EntityMeta::extract(&Event::default()).unwrap();
        Cursor::new(VecRows::new(rows), Arc::new(meta))
    }

    #[tokio::test]
    async fn test_maps_rows_and_discards_unknown_columns() {
        let cols = columns(&["id", "title", "extra", "day"]);
        let mut c = cursor(vec![
            RawRow::new(
                cols.clone(),
                vec![
                    Value::Text("1".into()),
                    Value::Text("a".into()),
                    Value::Int(5),
                    Value::Text("2021-01-02".into()),
                ],
            ),
            RawRow::new(
                cols,
                vec![Value::Int(2), Value::Text("b".into()), Value::Null, Value::Null],
            ),
        ]);

        assert!(c.advance().await);
        assert_eq!(
            c.take_current(),
            Some(Event {
                id: 1,
                title: "a".into(),
                day: NaiveDate::from_ymd_opt(2021, 1, 2),
            })
        );
        assert!(c.advance().await);
        assert_eq!(c.current().await.map(|e| e.id), Some(2));
        assert!(!c.advance().await);
        assert!(c.is_closed());
        assert!(c.error().is_none());
    }

    #[tokio::test]
    async fn test_current_advances_lazily() {
        let mut c = cursor(vec![RawRow::new(
            columns(&["title"]),
            vec![Value::Text("only".into())],
        )]);
        assert_eq!(c.current().await.map(|e| e.title.as_str()), Some("only"));
        // a second call does not advance again
        assert_eq!(c.current().await.map(|e| e.title.as_str()), Some("only"));
    }

    #[tokio::test]
    async fn test_empty_cursor() {
        let mut c = cursor(vec![]);
        assert!(c.current().await.is_none());
        assert!(c.is_closed());
        assert!(c.error().is_none());
    }

    #[tokio::test]
    async fn test_temporal_parse_failure_is_surfaced() {
        let cols = columns(&["id", "day"]);
        let mut c = cursor(vec![
            RawRow::new(cols.clone(), vec![Value::Int(1), Value::Text("not-a-date".into())]),
            RawRow::new(cols, vec![Value::Int(2), Value::Null]),
        ]);
        assert!(!c.advance().await);
        assert!(c.is_closed());
        match c.error() {
            Some(OrmError::Decode { column, .. }) => assert_eq!(column, "day"),
            other => panic!("unexpected: {other:?}"),
        }
        // iteration stops after an error
        assert!(!c.advance().await);
    }

    #[tokio::test]
    async fn test_into_vec() {
        let cols = columns(&["id"]);
        let c = cursor(vec![
            RawRow::new(cols.clone(), vec![Value::Int(1)]),
            RawRow::new(cols, vec![Value::Int(2)]),
        ]);
        let ids: Vec<i64> = c.into_vec().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, [1, 2]);
    }

    #[tokio::test]
    async fn test_into_vec_reports_error() {
        let c = cursor(vec![RawRow::new(
            columns(&["id"]),
            vec![Value::Text("x".into())],
        )]);
        assert!(c.into_vec().await.is_err());
    }
}
