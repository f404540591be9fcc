//! Fully-qualified entity names.
//!
//! An FQN is a dot-separated list of components, rooted at the application's
//! name prefix with the entity's structural name as the last component:
//! `billing.Order`. Case is preserved.
//!
//! Valid components:
//! - Must be non-empty
//! - Must start with an ASCII letter or `_`
//! - May contain only ASCII letters, digits and `_`
//! - Must not exceed [`MAX_NAME_LEN`] bytes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Longest accepted single component.
pub const MAX_NAME_LEN: usize = 128;

/// Validate a single name component (entity, column, or FQN segment).
///
/// # Examples
///
/// ```
/// use keel_types::fqn::validate_name;
///
/// assert!(validate_name("Order").is_ok());
/// assert!(validate_name("_internal2").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("9lives").is_err());
/// ```
pub fn validate_name(name: &str) -> TypeResult<()> {
    let invalid = |reason: String| TypeError::InvalidName {
        name: name.to_string(),
        reason,
    };

    let Some(first) = name.chars().next() else {
        return Err(invalid("name must not be empty".into()));
    };

    if name.len() > MAX_NAME_LEN {
        return Err(invalid(format!("longer than {MAX_NAME_LEN} bytes")));
    }

    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid(format!(
            "must start with a letter or '_', found {first:?}"
        )));
    }

    if let Some(ch) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }

    Ok(())
}

/// A validated fully-qualified name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fqn(String);

impl Fqn {
    /// Parse and validate a dotted name.
    pub fn parse(s: &str) -> TypeResult<Self> {
        if s.is_empty() {
            return Err(TypeError::InvalidFqn {
                fqn: s.to_string(),
                reason: "must not be empty".into(),
            });
        }
        for component in s.split('.') {
            validate_name(component).map_err(|e| TypeError::InvalidFqn {
                fqn: s.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(Self(s.to_string()))
    }

    /// Append one component.
    pub fn child(&self, name: &str) -> TypeResult<Fqn> {
        validate_name(name).map_err(|e| TypeError::InvalidFqn {
            fqn: format!("{}.{name}", self.0),
            reason: e.to_string(),
        })?;
        Ok(Self(format!("{}.{name}", self.0)))
    }

    /// Everything but the last component, or `None` for a single component.
    pub fn parent(&self) -> Option<Fqn> {
        self.0
            .rsplit_once('.')
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// The last component.
    pub fn name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Returns `true` if `self` is `other` or nested below it.
    pub fn starts_with(&self, other: &Fqn) -> bool {
        self.0 == other.0
            || (self.0.starts_with(&other.0) && self.0.as_bytes().get(other.0.len()) == Some(&b'.'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Fqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fqn({})", self.0)
    }
}

impl fmt::Display for Fqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fqn {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Fqn {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Fqn> for String {
    fn from(value: Fqn) -> Self {
        value.0
    }
}
