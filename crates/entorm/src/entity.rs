//! Entity metadata extraction.
//!
//! An [`Entity`] describes its own shape (normally via `#[derive(Entity)]`).
//! [`EntityMeta::extract`] validates that shape once and resolves the table
//! name, the column names and the per-field [`SemanticType`].

use std::collections::HashMap;

use heck::ToSnakeCase;

use crate::error::{OrmError, OrmResult};
use crate::value::{SemanticType, TemporalKind, Value};

/// A struct that maps onto one table.
///
/// # Example
///
/// ```ignore
/// use entorm::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// pub struct UserProfile {
///     #[orm(tag = "autoPk")]
///     pub id: i64,
///     pub nick_name: String,
///     #[orm(tag = "date")]
///     pub birthday: Option<chrono::NaiveDate>,
/// }
/// // table `user_profile`, columns `id`, `nick_name`, `birthday`
/// ```
pub trait Entity: Default + Send + Sync + 'static {
    /// Static description of the type and its attributes.
    fn shape() -> EntityShape;

    /// Current attribute values, in the order of [`EntityShape::attributes`].
    fn values(&self) -> Vec<Value>;

    /// Assign a scanned value to the attribute with the given name.
    fn assign(&mut self, attribute: &str, value: Value) -> OrmResult<()>;
}

/// What kind of type the shape was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Struct,
    TupleStruct,
    UnitStruct,
    Enum,
}

/// Description of an entity type.
#[derive(Debug, Clone)]
pub struct EntityShape {
    /// Rust type name, e.g. `UserProfile`.
    pub name: &'static str,
    pub kind: ShapeKind,
    pub attributes: Vec<AttributeShape>,
}

/// Description of one attribute.
#[derive(Debug, Clone)]
pub struct AttributeShape {
    /// Rust attribute name.
    pub name: &'static str,
    /// Type as written in the source, for error messages.
    pub type_name: &'static str,
    /// `None` when the type is outside the supported set.
    pub semantic: Option<SemanticType>,
    /// Whether the attribute is `pub`.
    pub public: bool,
    /// Raw tag value from `#[orm(tag = "...")]`.
    pub tag: Option<&'static str>,
}

/// Recognized attribute tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// `autoPk`: primary key generated by the database.
    AutoPk,
    /// `pk`: primary key supplied by the caller.
    Pk,
    /// `date`
    Date,
    /// `dateTime`
    DateTime,
    /// `time`
    Time,
}

impl Tag {
    /// Parse a tag value; unrecognized values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "autoPk" => Some(Tag::AutoPk),
            "pk" => Some(Tag::Pk),
            "date" => Some(Tag::Date),
            "dateTime" => Some(Tag::DateTime),
            "time" => Some(Tag::Time),
            _ => None,
        }
    }

    fn temporal_kind(self) -> TemporalKind {
        match self {
            Tag::Date => TemporalKind::Date,
            Tag::Time => TemporalKind::Time,
            _ => TemporalKind::DateTime,
        }
    }
}

/// Metadata for one mapped attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub column: String,
    pub attribute: &'static str,
    pub semantic: SemanticType,
    pub temporal: TemporalKind,
    pub is_primary_key: bool,
    pub is_auto_generated: bool,
    /// Attribute value at the last extraction or refresh.
    pub value: Value,
}

impl FieldDescriptor {
    /// The value to bind for this field, or `None` for an unset temporal.
    ///
    /// Temporal values are bound as text in the field's layout.
    pub fn binding(&self) -> Option<Value> {
        if self.semantic != SemanticType::Temporal {
            return Some(self.value.clone());
        }
        match &self.value {
            Value::Null => None,
            Value::Temporal(dt) => Some(Value::Text(self.temporal.format(dt))),
            other => Some(other.clone()),
        }
    }
}

/// Table name plus field descriptors in declaration order.
#[derive(Debug, Clone)]
pub struct EntityMeta {
    table: String,
    fields: Vec<FieldDescriptor>,
    by_column: HashMap<String, usize>,
    primary_key: Option<usize>,
}

impl EntityMeta {
    /// Extract metadata from an entity instance.
    pub fn extract<E: Entity>(entity: &E) -> OrmResult<Self> {
        Self::from_shape(&E::shape(), entity.values())
    }

    /// Validate a shape and pair it with attribute values.
    pub fn from_shape(shape: &EntityShape, values: Vec<Value>) -> OrmResult<Self> {
        if shape.kind != ShapeKind::Struct {
            return Err(OrmError::entity_shape(format!(
                "`{}` must be a struct with named fields, got {:?}",
                shape.name, shape.kind
            )));
        }
        if values.len() != shape.attributes.len() {
            return Err(OrmError::entity_shape(format!(
                "`{}` reported {} values for {} attributes",
                shape.name,
                values.len(),
                shape.attributes.len()
            )));
        }

        let mut fields = Vec::with_capacity(shape.attributes.len());
        let mut by_column = HashMap::with_capacity(shape.attributes.len());
        let mut primary_key: Option<usize> = None;

        for (attr, value) in shape.attributes.iter().zip(values) {
            let Some(semantic) = attr.semantic else {
                return Err(OrmError::entity_shape(format!(
                    "unsupported field type `{}` on `{}.{}`",
                    attr.type_name, shape.name, attr.name
                )));
            };
            if !attr.public {
                return Err(OrmError::entity_shape(format!(
                    "field `{}.{}` is not public",
                    shape.name, attr.name
                )));
            }

            let column = to_snake_case(attr.name);
            let tag = attr.tag.and_then(Tag::parse);
            let is_primary_key = matches!(tag, Some(Tag::AutoPk | Tag::Pk));

            if is_primary_key {
                if let Some(existing) = primary_key {
                    let existing: &FieldDescriptor = &fields[existing];
                    return Err(OrmError::entity_shape(format!(
                        "primary key already set to `{}`, cannot also use `{column}`",
                        existing.column
                    )));
                }
                primary_key = Some(fields.len());
            }

            if by_column.insert(column.clone(), fields.len()).is_some() {
                return Err(OrmError::entity_shape(format!(
                    "column `{column}` is mapped by more than one field of `{}`",
                    shape.name
                )));
            }

            fields.push(FieldDescriptor {
                column,
                attribute: attr.name,
                semantic,
                temporal: tag.map(Tag::temporal_kind).unwrap_or_default(),
                is_primary_key,
                is_auto_generated: tag == Some(Tag::AutoPk),
                value,
            });
        }

        Ok(Self {
            table: to_snake_case(shape.name),
            fields,
            by_column,
            primary_key,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Field descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by column name.
    pub fn field(&self, column: &str) -> Option<&FieldDescriptor> {
        self.by_column.get(column).map(|&i| &self.fields[i])
    }

    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.primary_key.map(|i| &self.fields[i])
    }

    /// Replace the captured attribute values with fresh ones.
    pub fn refresh_values(&mut self, values: Vec<Value>) {
        for (field, value) in self.fields.iter_mut().zip(values) {
            field.value = value;
        }
    }
}

/// Convert an upper-camel-case identifier to snake_case.
///
/// `UserName` → `user_name`, `ID` → `id`. An acronym run stays one word:
/// `UserID` → `user_id`. Already snake-cased identifiers are returned
/// unchanged.
pub fn to_snake_case(ident: &str) -> String {
    ident.to_snake_case()
}
