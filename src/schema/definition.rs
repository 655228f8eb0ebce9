//! Typed schema documents.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Value types a schema node can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// JSON string
    String,
    /// Any JSON number
    Number,
    /// Any JSON number as well; fractional values are not rejected
    Integer,
    /// `true` / `false`
    Boolean,
    /// JSON array
    Array,
    /// JSON object
    Object,
    /// `null`
    Null,
}

impl ValueKind {
    /// Schema name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Null => "null",
        }
    }

    /// Kind of a JSON value; numbers always report `number`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Check whether a value satisfies this kind.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueKind::String, Value::String(_)) => true,
            (ValueKind::Number | ValueKind::Integer, Value::Number(_)) => true,
            (ValueKind::Boolean, Value::Bool(_)) => true,
            (ValueKind::Array, Value::Array(_)) => true,
            (ValueKind::Object, Value::Object(_)) => true,
            (ValueKind::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of a schema tree.
///
/// Keys not listed here (`$schema`, `title`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    /// Expected value kind; any value is accepted when absent
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValueKind>,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Required property names (objects)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Declared properties (objects)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,

    /// Element schema (arrays)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,

    /// Minimum string length in characters
    #[serde(rename = "minLength", default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum string length in characters
    #[serde(rename = "maxLength", default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Allowed values
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,

    /// Inclusive numeric lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    /// Inclusive numeric upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    /// Minimum array length
    #[serde(rename = "minItems", default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,

    /// Maximum array length
    #[serde(rename = "maxItems", default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl SchemaNode {
    /// Node requiring a value kind.
    pub fn of_kind(kind: ValueKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Add a property, optionally required.
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        node: SchemaNode,
        required: bool,
    ) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, node);
        self
    }

    /// Set the element schema.
    pub fn with_items(mut self, items: SchemaNode) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    /// Check if a property is required.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Effective kind: declared, or inferred from `properties`/`items`.
    pub fn effective_kind(&self) -> Option<ValueKind> {
        self.kind.or_else(|| {
            if !self.properties.is_empty() || !self.required.is_empty() {
                Some(ValueKind::Object)
            } else if self.items.is_some() {
                Some(ValueKind::Array)
            } else {
                None
            }
        })
    }

    fn check(&self, path: &str) -> std::result::Result<(), String> {
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(format!("{}: minLength {} exceeds maxLength {}", at(path), min, max));
            }
        }
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                return Err(format!("{}: minimum {} exceeds maximum {}", at(path), min, max));
            }
        }
        if let (Some(min), Some(max)) = (self.min_items, self.max_items) {
            if min > max {
                return Err(format!("{}: minItems {} exceeds maxItems {}", at(path), min, max));
            }
        }
        if let Some(allowed) = &self.allowed {
            if allowed.is_empty() {
                return Err(format!("{}: enum must not be empty", at(path)));
            }
        }
        for (name, child) in &self.properties {
            child.check(&join(path, name))?;
        }
        if let Some(items) = &self.items {
            items.check(&format!("{}[]", path))?;
        }
        Ok(())
    }
}

/// A named, parsed schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDef {
    /// Registry name (e.g. `translation_response`)
    pub name: String,
    /// Root node
    pub root: SchemaNode,
    /// Document as loaded
    pub raw: Value,
}

impl SchemaDef {
    /// Parse a schema from JSON text.
    pub fn from_json(name: &str, text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::invalid_schema(name, e.to_string()))?;
        Self::from_value(name, value)
    }

    /// Build a schema from a JSON value.
    ///
    /// The root must be an object schema; an unknown `type` name or
    /// contradictory bounds make the schema invalid.
    pub fn from_value(name: &str, value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::invalid_schema(name, "root must be a JSON object"));
        }
        let root: SchemaNode = serde_json::from_value(value.clone())
            .map_err(|e| Error::invalid_schema(name, e.to_string()))?;

        if let Some(kind) = root.kind {
            if kind != ValueKind::Object {
                return Err(Error::invalid_schema(
                    name,
                    format!("root type must be object, found {}", kind),
                ));
            }
        }
        root.check("").map_err(|reason| Error::invalid_schema(name, reason))?;

        Ok(Self {
            name: name.to_string(),
            root,
            raw: value,
        })
    }

    /// Names of required top-level fields.
    pub fn required_fields(&self) -> &[String] {
        &self.root.required
    }
}

/// Join a field path and a property name.
pub(crate) fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn at(path: &str) -> &str {
    if path.is_empty() {
        "root"
    } else {
        path
    }
}
