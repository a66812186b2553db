//! Derive macros for entorm
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive `Entity` for a struct with named fields.
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
/// ```
///
/// # Generated
///
/// - `fn shape() -> EntityShape` - type name, attribute names, semantic types, visibility and tags
/// - `fn values(&self) -> Vec<Value>` - current attribute values in declaration order
/// - `fn assign(&mut self, attribute, value)` - write one scanned value back
///
/// # Attributes
///
/// - `#[orm(tag = "autoPk")]` - Database-generated primary key
/// - `#[orm(tag = "pk")]` - Caller-supplied primary key
/// - `#[orm(tag = "date" | "time" | "dateTime")]` - Temporal layout
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
