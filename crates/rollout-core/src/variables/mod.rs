//! Environment topology exposed to deployment scripts as named variables.
//!
//! Values are a tagged union so consumers can branch on shape. A property
//! family such as `ServerNames_<tag>` is a [`VariableValue::Scalar`] when one
//! server matches and a [`VariableValue::Array`] when several do.

mod resolver;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

pub use resolver::{ENDUR_DB_PREFIX, VariableScopeResolver};

/// Shape of a [`VariableValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Scalar,
    Array,
    Table,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Scalar => "scalar",
            ValueKind::Array => "array",
            ValueKind::Table => "table",
        };
        f.write_str(name)
    }
}

/// A value in the variable scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum VariableValue {
    Scalar(String),
    Array(Vec<String>),
    /// Structured rows, e.g. per-server records
    Table(Vec<VariableRecord>),
}

impl VariableValue {
    pub fn scalar(value: impl Into<String>) -> Self {
        VariableValue::Scalar(value.into())
    }

    /// A scalar for exactly one match, an array otherwise.
    pub fn from_matches(mut values: Vec<String>) -> Self {
        match values.len() {
            1 => VariableValue::Scalar(values.remove(0)),
            _ => VariableValue::Array(values),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            VariableValue::Scalar(_) => ValueKind::Scalar,
            VariableValue::Array(_) => ValueKind::Array,
            VariableValue::Table(_) => ValueKind::Table,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            VariableValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[String]> {
        match self {
            VariableValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&[VariableRecord]> {
        match self {
            VariableValue::Table(rows) => Some(rows),
            _ => None,
        }
    }
}

/// One row of a [`VariableValue::Table`]; fields keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRecord {
    fields: Vec<(String, VariableValue)>,
}

impl VariableRecord {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: VariableValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &VariableValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Destination for resolved variables.
pub trait VariableContext {
    fn set(&mut self, key: String, value: VariableValue);
}

impl VariableContext for HashMap<String, VariableValue> {
    fn set(&mut self, key: String, value: VariableValue) {
        self.insert(key, value);
    }
}

impl VariableContext for BTreeMap<String, VariableValue> {
    fn set(&mut self, key: String, value: VariableValue) {
        self.insert(key, value);
    }
}
