use std::collections::BTreeMap;
use std::fmt;

use keel_value::{FieldValue, FieldValues};
use serde::{Deserialize, Serialize};

use crate::error::ConnectorResult;

/// Every operation on the connector contract, used for errors and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    CheckSchema,
    UpsertSchema,
    CheckSchemaStatus,
    CreateScope,
    TruncateScope,
    DropScope,
    ScopeExists,
    CreateIfNotExists,
    Read,
    MultiRead,
    Upsert,
    MultiUpsert,
    Remove,
    MultiRemove,
    Range,
    Search,
    Scan,
    Shutdown,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CheckSchema => "CheckSchema",
            Operation::UpsertSchema => "UpsertSchema",
            Operation::CheckSchemaStatus => "CheckSchemaStatus",
            Operation::CreateScope => "CreateScope",
            Operation::TruncateScope => "TruncateScope",
            Operation::DropScope => "DropScope",
            Operation::ScopeExists => "ScopeExists",
            Operation::CreateIfNotExists => "CreateIfNotExists",
            Operation::Read => "Read",
            Operation::MultiRead => "MultiRead",
            Operation::Upsert => "Upsert",
            Operation::MultiUpsert => "MultiUpsert",
            Operation::Remove => "Remove",
            Operation::MultiRemove => "MultiRemove",
            Operation::Range => "Range",
            Operation::Search => "Search",
            Operation::Scan => "Scan",
            Operation::Shutdown => "Shutdown",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-row outcomes of a batch call, aligned by index with the input.
pub type BatchResult<T> = Vec<ConnectorResult<T>>;

/// Comparison operator of a range condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Lt,
    LtOrEq,
    Gt,
    GtOrEq,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::LtOrEq => "<=",
            Operator::Gt => ">",
            Operator::GtOrEq => ">=",
        })
    }
}

/// One predicate on a key column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub op: Operator,
    pub value: FieldValue,
}

impl Condition {
    pub fn new(op: Operator, value: impl Into<FieldValue>) -> Self {
        Self {
            op,
            value: value.into(),
        }
    }

    pub fn equals(value: impl Into<FieldValue>) -> Self {
        Self::new(Operator::Eq, value)
    }

    /// Whether `actual` satisfies this condition.
    pub fn matches(&self, actual: &FieldValue) -> bool {
        let ord = actual.cmp(&self.value);
        match self.op {
            Operator::Eq => ord.is_eq(),
            Operator::Lt => ord.is_lt(),
            Operator::LtOrEq => ord.is_le(),
            Operator::Gt => ord.is_gt(),
            Operator::GtOrEq => ord.is_ge(),
        }
    }
}

/// Range predicates by column name. All conditions must hold.
pub type Conditions = BTreeMap<String, Vec<Condition>>;

/// A single column equality, the predicate of [`Connector::search`].
///
/// [`Connector::search`]: crate::Connector::search
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNameValuePair {
    pub name: String,
    pub value: FieldValue,
}

impl FieldNameValuePair {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaState {
    Applied,
    Pending,
}

/// Where a schema version stands on a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaStatus {
    pub version: i32,
    pub state: SchemaState,
}

impl SchemaStatus {
    pub fn applied(version: i32) -> Self {
        Self {
            version,
            state: SchemaState::Applied,
        }
    }

    pub fn pending(version: i32) -> Self {
        Self {
            version,
            state: SchemaState::Pending,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.state == SchemaState::Applied
    }
}

/// One page of a range, search or scan. Pass `token` back to continue; no
/// token means the listing is exhausted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub rows: Vec<FieldValues>,
    pub token: Option<String>,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.token.is_none()
    }
}
