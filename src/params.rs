//! Parameter mapping consumed by templates
//!
//! Parameters are loosely typed: the placeholder that reads a parameter
//! decides which shapes it accepts. Scalar placeholders need a string or
//! number, loop inputs need an integer or a list.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a parameter file
#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("Failed to read parameter file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse parameter TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// A single parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Map(_) => "mapping",
        }
    }

    /// Whether the value has a well-defined scalar string form
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Map(_))
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Canonical float form: shortest round-trip digits, always with a
/// fractional part (`10.0`, `10.5`, `-0.25`).
pub fn format_float(x: f64) -> String {
    let s = x.to_string();
    if !x.is_finite() || s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(n) => Value::Integer(n),
            toml::Value::Float(x) => Value::Float(x),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            toml::Value::Table(table) => {
                Value::Map(table.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Named parameters for one template expansion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    /// Optional name from the parameter file metadata
    pub name: Option<String>,
    values: BTreeMap<String, Value>,
}

/// TOML structure for deserializing parameter files
#[derive(Deserialize)]
struct TomlParameters {
    metadata: Option<TomlMetadata>,
    #[serde(default)]
    parameters: toml::Table,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load parameters from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ParamsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load parameters from a TOML string
    ///
    /// Values live in a `[parameters]` table; an optional `[metadata]` table
    /// may name the parameter set.
    pub fn from_str(content: &str) -> Result<Self, ParamsError> {
        let parsed: TomlParameters = toml::from_str(content)?;

        Ok(Parameters {
            name: parsed.metadata.and_then(|m| m.name),
            values: parsed
                .parameters
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect(),
        })
    }

    /// Set a parameter, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Merge another parameter set over this one
    pub fn extend(&mut self, other: Parameters) {
        if other.name.is_some() {
            self.name = other.name;
        }
        self.values.extend(other.values);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Parameters {
            name: None,
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
