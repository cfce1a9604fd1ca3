use crate::{AsValue, DataError, Result, Value};
use serde_json::{Map, Number};
use std::fmt::{self, Display, Formatter};

/// Arbitrary json document stored in a `jsonb` column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnyJson(pub serde_json::Value);

/// One step of a path inside a json document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKey<'a> {
    Str(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for JsonKey<'a> {
    fn from(value: &'a str) -> Self {
        JsonKey::Str(value)
    }
}

impl From<usize> for JsonKey<'_> {
    fn from(value: usize) -> Self {
        JsonKey::Index(value)
    }
}

impl Display for JsonKey<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsonKey::Str(v) => f.write_str(v),
            JsonKey::Index(v) => write!(f, "[{}]", v),
        }
    }
}

fn unexpected(path: &[JsonKey<'_>]) -> crate::Error {
    let path = path
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".");
    DataError::UnexpectedJson(path).into()
}

impl AnyJson {
    /// Value at `path`, `None` when a step is missing.
    pub fn peek(&self, path: &[JsonKey<'_>]) -> Option<&serde_json::Value> {
        path.iter().try_fold(&self.0, |current, key| match key {
            JsonKey::Str(k) => current.as_object()?.get(*k),
            JsonKey::Index(i) => current.as_array()?.get(*i),
        })
    }

    pub fn peek_map(&self, path: &[JsonKey<'_>]) -> Result<&Map<String, serde_json::Value>> {
        self.peek(path)
            .and_then(serde_json::Value::as_object)
            .ok_or_else(|| unexpected(path))
    }

    pub fn peek_array(&self, path: &[JsonKey<'_>]) -> Result<&Vec<serde_json::Value>> {
        self.peek(path)
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| unexpected(path))
    }

    pub fn peek_str(&self, path: &[JsonKey<'_>]) -> Result<&str> {
        self.peek(path)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| unexpected(path))
    }

    pub fn peek_number(&self, path: &[JsonKey<'_>]) -> Result<&Number> {
        match self.peek(path) {
            Some(serde_json::Value::Number(v)) => Ok(v),
            _ => Err(unexpected(path)),
        }
    }

    pub fn peek_bool(&self, path: &[JsonKey<'_>]) -> Result<bool> {
        self.peek(path)
            .and_then(serde_json::Value::as_bool)
            .ok_or_else(|| unexpected(path))
    }
}

impl AsValue for AnyJson {
    fn as_empty_value() -> Value {
        Value::Json(None)
    }
    fn as_value(self) -> Value {
        Value::Json(Some(self.0))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        serde_json::Value::try_from_value(value).map(AnyJson)
    }
}
