//! Row checks and projections shared by backends.

use keel_types::{EntityDefinition, EntityInfo};
use keel_value::{FieldValue, FieldValues};

use crate::error::{ConnectorError, ConnectorResult};

/// Local addressing checks for `ei`.
pub fn check_entity_info(ei: &EntityInfo) -> ConnectorResult<()> {
    ei.validate()?;
    Ok(())
}

/// The key component values of `values`, partition keys first.
///
/// Every key column must be present and non-null.
pub fn key_values(def: &EntityDefinition, values: &FieldValues) -> ConnectorResult<Vec<FieldValue>> {
    def.key_fields()
        .map(|name| match values.get(name) {
            Some(v) if !v.is_null() => Ok(v.clone()),
            Some(_) => Err(ConnectorError::InvalidArgument(format!(
                "key field {}.{name} is null",
                def.name
            ))),
            None => Err(ConnectorError::InvalidArgument(format!(
                "missing key field {}.{name}",
                def.name
            ))),
        })
        .collect()
}

/// Every field must be a declared column of the declared kind. Nulls of
/// the right kind are accepted.
pub fn check_columns(def: &EntityDefinition, values: &FieldValues) -> ConnectorResult<()> {
    for (name, value) in values {
        check_field(def, name, value)?;
    }
    Ok(())
}

pub fn check_field(def: &EntityDefinition, name: &str, value: &FieldValue) -> ConnectorResult<()> {
    match def.column_kind(name) {
        None => Err(ConnectorError::InvalidArgument(format!(
            "{} has no column {name}",
            def.name
        ))),
        Some(kind) if kind != value.kind() => Err(ConnectorError::InvalidArgument(format!(
            "column {}.{name} is {kind}, got {}",
            def.name,
            value.kind()
        ))),
        Some(_) => Ok(()),
    }
}

/// Every requested field must be a declared column.
pub fn check_projection(def: &EntityDefinition, fields: &[&str]) -> ConnectorResult<()> {
    match fields.iter().find(|f| def.column(f).is_none()) {
        Some(f) => Err(ConnectorError::InvalidArgument(format!(
            "{} has no column {f}",
            def.name
        ))),
        None => Ok(()),
    }
}

/// `row` limited to `fields`; all of it when `fields` is empty. Requested
/// fields the row lacks are left out.
pub fn project(row: &FieldValues, fields: &[&str]) -> FieldValues {
    if fields.is_empty() {
        return row.clone();
    }
    fields
        .iter()
        .filter_map(|f| row.get(*f).map(|v| (f.to_string(), v.clone())))
        .collect()
}
