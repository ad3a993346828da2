//! Typed access to configuration objects.
//!
//! The host hands configuration and state over as JSON. [`Fields`] wraps one
//! object of that tree and remembers where it sits, so every error names the
//! full attribute path (`step.1.transform.mask.path`). Null and absent
//! attributes are treated the same.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::enums::{parse_enum, ProtoEnum};
use crate::error::ProviderError;

/// A JSON object plus its attribute path.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: Option<&'a Map<String, Value>>,
    path: &'a str,
}

/// A nested block and its attribute path.
#[derive(Debug, Clone)]
pub struct Nested<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Nested<'a> {
    /// Borrow the block's fields.
    pub fn fields(&self) -> Result<Fields<'_>, ProviderError> {
        Fields::at(self.value, &self.path)
    }

    /// Attribute path of the block.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<'a> Fields<'a> {
    /// Wrap the root object. Null is accepted as an empty object.
    pub fn root(value: &'a Value) -> Result<Self, ProviderError> {
        Self::at(value, "")
    }

    /// Wrap an object found at `path`.
    pub fn at(value: &'a Value, path: &'a str) -> Result<Self, ProviderError> {
        match value {
            Value::Object(map) => Ok(Self {
                map: Some(map),
                path,
            }),
            Value::Null => Ok(Self { map: None, path }),
            other => Err(ProviderError::InvalidAttribute {
                attribute: display_path(path),
                message: format!("expected object, got {}", type_name(other)),
            }),
        }
    }

    /// Path of an attribute inside this object.
    pub fn path_of(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    /// Raw value, with null folded into `None`.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map
            .and_then(|m| m.get(key))
            .filter(|v| !v.is_null())
    }

    /// Names of the attributes that are set, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.map
            .into_iter()
            .flat_map(|m| m.iter())
            .filter(|(_, v)| !v.is_null())
            .map(|(k, _)| k.as_str())
    }

    /// Whether the attribute is set.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Required string.
    pub fn str(&self, key: &str) -> Result<String, ProviderError> {
        self.opt_str(key)?.ok_or_else(|| self.missing(key))
    }

    /// Optional string.
    pub fn opt_str(&self, key: &str) -> Result<Option<String>, ProviderError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.wrong_type(key, "string", other)),
        }
    }

    /// String with a default.
    pub fn str_or(&self, key: &str, default: &str) -> Result<String, ProviderError> {
        Ok(self.opt_str(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Optional bool.
    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>, ProviderError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.wrong_type(key, "bool", other)),
        }
    }

    /// Bool with a default.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ProviderError> {
        Ok(self.opt_bool(key)?.unwrap_or(default))
    }

    /// Required integer.
    pub fn int(&self, key: &str) -> Result<i64, ProviderError> {
        if !self.has(key) {
            return Err(self.missing(key));
        }
        self.int_or(key, 0)
    }

    /// Required integer that must fit in 32 bits.
    pub fn int32(&self, key: &str) -> Result<i32, ProviderError> {
        narrow(self.int(key)?, &self.path_of(key))
    }

    /// 32-bit integer with a default.
    pub fn int32_or(&self, key: &str, default: i32) -> Result<i32, ProviderError> {
        narrow(self.int_or(key, i64::from(default))?, &self.path_of(key))
    }

    /// Integer with a default. Whole-valued floats are accepted.
    pub fn int_or(&self, key: &str, default: i64) -> Result<i64, ProviderError> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| self.wrong_type(key, "integer", &Value::Number(n.clone()))),
            Some(other) => Err(self.wrong_type(key, "integer", other)),
        }
    }

    /// List of strings; absent means empty.
    pub fn strings(&self, key: &str) -> Result<Vec<String>, ProviderError> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(ProviderError::InvalidAttribute {
                        attribute: format!("{}.{}", self.path_of(key), i),
                        message: format!("expected string, got {}", type_name(other)),
                    }),
                })
                .collect(),
            Some(other) => Err(self.wrong_type(key, "list", other)),
        }
    }

    /// Map of strings; absent means empty.
    pub fn string_map(&self, key: &str) -> Result<HashMap<String, String>, ProviderError> {
        match self.get(key) {
            None => Ok(HashMap::new()),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k.clone(), s.clone())),
                    other => Err(ProviderError::InvalidAttribute {
                        attribute: format!("{}.{}", self.path_of(key), k),
                        message: format!("expected string, got {}", type_name(other)),
                    }),
                })
                .collect(),
            Some(other) => Err(self.wrong_type(key, "map", other)),
        }
    }

    /// Required enum, parsed by configuration name.
    pub fn enum_value<E: ProtoEnum>(&self, key: &str) -> Result<E, ProviderError> {
        let raw = self.str(key)?;
        parse_enum(&raw, &self.path_of(key))
    }

    /// Enum with a default.
    pub fn enum_or<E: ProtoEnum>(&self, key: &str, default: E) -> Result<E, ProviderError> {
        match self.opt_str(key)? {
            Some(raw) => parse_enum(&raw, &self.path_of(key)),
            None => Ok(default),
        }
    }

    /// A single nested block.
    ///
    /// Blocks are objects; a list holding at most one object is accepted
    /// too, since some hosts encode single blocks that way.
    pub fn block(&self, key: &str) -> Result<Option<Nested<'a>>, ProviderError> {
        match self.get(key) {
            None => Ok(None),
            Some(value @ Value::Object(_)) => Ok(Some(Nested {
                value,
                path: self.path_of(key),
            })),
            Some(Value::Array(items)) => match items.as_slice() {
                [] => Ok(None),
                [value @ Value::Object(_)] => Ok(Some(Nested {
                    value,
                    path: self.path_of(key),
                })),
                _ => Err(ProviderError::InvalidAttribute {
                    attribute: self.path_of(key),
                    message: "expected a single block".to_string(),
                }),
            },
            Some(other) => Err(self.wrong_type(key, "block", other)),
        }
    }

    /// A single nested block that must be present.
    pub fn required_block(&self, key: &str, context: &str) -> Result<Nested<'a>, ProviderError> {
        self.block(key)?.ok_or_else(|| ProviderError::MissingBlock {
            block: key.to_string(),
            context: context.to_string(),
            attribute: self.path_of(key),
        })
    }

    /// A list of nested blocks; absent means empty.
    pub fn blocks(&self, key: &str) -> Result<Vec<Nested<'a>>, ProviderError> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items
                .iter()
                .enumerate()
                .map(|(i, value)| Nested {
                    value,
                    path: format!("{}.{}", self.path_of(key), i),
                })
                .collect()),
            Some(other) => Err(self.wrong_type(key, "list", other)),
        }
    }

    fn missing(&self, key: &str) -> ProviderError {
        ProviderError::InvalidAttribute {
            attribute: self.path_of(key),
            message: format!("missing required attribute '{}'", key),
        }
    }

    fn wrong_type(&self, key: &str, expected: &str, got: &Value) -> ProviderError {
        ProviderError::InvalidAttribute {
            attribute: self.path_of(key),
            message: format!("expected {}, got {}", expected, type_name(got)),
        }
    }
}

fn narrow(value: i64, path: &str) -> Result<i32, ProviderError> {
    i32::try_from(value).map_err(|_| ProviderError::InvalidAttribute {
        attribute: path.to_string(),
        message: format!("{} is out of range for a 32-bit integer", value),
    })
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
