use keel_types::{EntityDefinition, TypeResult};
use keel_value::{FieldValues, ValueResult};

/// A record type that can be registered and persisted.
///
/// Registration is explicit: each type states its structural name and
/// schema, and converts itself to and from a row of field values.
///
/// ```
/// use keel_registry::DomainObject;
/// use keel_types::{ColumnDefinition, EntityDefinition, TypeResult};
/// use keel_value::{required, FieldValues, ScalarType, ValueResult};
///
/// struct Order {
///     id: i64,
///     total: i64,
/// }
///
/// impl DomainObject for Order {
///     const NAME: &'static str = "Order";
///
///     fn definition() -> TypeResult<EntityDefinition> {
///         EntityDefinition::from_tag(
///             Self::NAME,
///             "primaryKey=(ID)",
///             vec![
///                 ColumnDefinition::new("ID", ScalarType::Int64),
///                 ColumnDefinition::new("Total", ScalarType::Int64),
///             ],
///         )
///     }
///
///     fn to_values(&self) -> FieldValues {
///         FieldValues::from([
///             ("ID".to_string(), self.id.into()),
///             ("Total".to_string(), self.total.into()),
///         ])
///     }
///
///     fn from_values(values: &FieldValues) -> ValueResult<Self> {
///         Ok(Self {
///             id: required(values, "ID")?,
///             total: required(values, "Total")?,
///         })
///     }
/// }
/// ```
pub trait DomainObject: Sized {
    /// Structural name. Must equal the name of [`DomainObject::definition`].
    const NAME: &'static str;

    /// The entity's schema.
    fn definition() -> TypeResult<EntityDefinition>;

    /// This instance as a row.
    fn to_values(&self) -> FieldValues;

    /// Rebuild an instance from a row.
    fn from_values(values: &FieldValues) -> ValueResult<Self>;
}
