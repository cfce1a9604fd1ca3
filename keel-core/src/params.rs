use crate::{DataError, Record, Registry, Result, SqlWriter, Value};
use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
};

/// A `${name}` occurrence, `begin..end` is its byte span in the query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub name: &'a str,
    pub begin: usize,
    pub end: usize,
}

/// Find every `${name}` outside quoted regions, in document order.
///
/// A `$` not followed by `{` is plain text. A token that is not closed before the end of the text
/// or before a quote character is left as it is.
pub fn placeholders(text: &str) -> Vec<Placeholder<'_>> {
    let bytes = text.as_bytes();
    let mut result = Vec::new();
    let mut quote = None;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            b'\'' | b'"' => quote = Some(c),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                let start = i + 2;
                let mut end = start;
                while end < bytes.len() && !matches!(bytes[end], b'}' | b'\'' | b'"') {
                    end += 1;
                }
                if bytes.get(end) == Some(&b'}') {
                    result.push(Placeholder {
                        name: &text[start..end],
                        begin: i,
                        end: end + 1,
                    });
                    i = end + 1;
                } else {
                    i = start;
                }
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    result
}

/// Rewrite the named placeholders of `text` into the positional syntax of `writer`.
///
/// Returns the rewritten query and the key of every positional slot. Without placeholders the
/// text is returned borrowed with no keys.
pub fn scan_params<'a>(text: &'a str, writer: &dyn SqlWriter) -> (Cow<'a, str>, Option<Vec<String>>) {
    if !text.contains("${") {
        return (Cow::Borrowed(text), None);
    }
    let found = placeholders(text);
    if found.is_empty() {
        return (Cow::Borrowed(text), None);
    }
    let mut out = String::with_capacity(text.len());
    let mut keys = Vec::with_capacity(found.len());
    let mut position = 0;
    for (ordinal, placeholder) in found.into_iter().enumerate() {
        out.push_str(&text[position..placeholder.begin]);
        writer.write_placeholder(&mut out, ordinal, placeholder.name);
        keys.push(placeholder.name.to_string());
        position = placeholder.end;
    }
    out.push_str(&text[position..]);
    (Cow::Owned(out), Some(keys))
}

/// Source of query arguments.
///
/// `keys` are the placeholder names in slot order, `None` when the query had no placeholder.
pub trait Params: Sync {
    fn param_values(&self, keys: Option<&[String]>, registry: &Registry) -> Result<Vec<Value>>;
}

pub type ParamMap = HashMap<String, Value>;

fn values_by_key<'v>(
    keys: Option<&[String]>,
    mut get: impl FnMut(&str) -> Option<&'v Value>,
) -> Result<Vec<Value>> {
    let Some(keys) = keys else {
        return Ok(Vec::new());
    };
    keys.iter()
        .map(|k| {
            get(k)
                .cloned()
                .ok_or_else(|| DataError::MissingKey(k.clone()).into())
        })
        .collect()
}

impl Params for HashMap<String, Value> {
    fn param_values(&self, keys: Option<&[String]>, _registry: &Registry) -> Result<Vec<Value>> {
        values_by_key(keys, |k| self.get(k))
    }
}

impl Params for BTreeMap<String, Value> {
    fn param_values(&self, keys: Option<&[String]>, _registry: &Registry) -> Result<Vec<Value>> {
        values_by_key(keys, |k| self.get(k))
    }
}

/// Positional arguments, passed through as they are.
impl Params for [Value] {
    fn param_values(&self, _keys: Option<&[String]>, _registry: &Registry) -> Result<Vec<Value>> {
        Ok(self.to_vec())
    }
}

impl Params for Vec<Value> {
    fn param_values(&self, keys: Option<&[String]>, registry: &Registry) -> Result<Vec<Value>> {
        self.as_slice().param_values(keys, registry)
    }
}

/// No arguments.
impl Params for () {
    fn param_values(&self, keys: Option<&[String]>, _registry: &Registry) -> Result<Vec<Value>> {
        match keys.and_then(|v| v.first()) {
            Some(k) => Err(DataError::MissingKey(k.clone()).into()),
            None => Ok(Vec::new()),
        }
    }
}

impl<P: Params + ?Sized> Params for &P {
    fn param_values(&self, keys: Option<&[String]>, registry: &Registry) -> Result<Vec<Value>> {
        (**self).param_values(keys, registry)
    }
}

/// Arguments read from the fields of a record, by column name.
pub fn record_params<R: Record>(
    record: &R,
    keys: Option<&[String]>,
    registry: &Registry,
) -> Result<Vec<Value>> {
    let Some(keys) = keys else {
        return Ok(Vec::new());
    };
    let schema = registry.resolve::<R>()?;
    keys.iter()
        .map(|k| match schema.field(k) {
            Some(field) => record.value_at(&field.path),
            None => Err(DataError::MissingKey(k.clone()).into()),
        })
        .collect()
}

/// Build a [`ParamMap`] from `key => value` pairs.
#[macro_export]
macro_rules! params {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::ParamMap::new();
        $(map.insert(::std::string::String::from($key), $crate::Value::from($value));)*
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorExt, GenericSqlWriter};

    #[test]
    fn fast_path_borrows() {
        let (query, keys) = scan_params("SELECT $1, '${a}'", &GenericSqlWriter);
        assert!(matches!(query, Cow::Borrowed(..)));
        assert!(keys.is_none());
    }

    #[test]
    fn spans() {
        let found = placeholders("a=${a} b=\"${b}\" c=${c");
        assert_eq!(
            found,
            [Placeholder {
                name: "a",
                begin: 2,
                end: 6
            }]
        );
    }

    #[test]
    fn missing_keys() {
        let registry = Registry::new();
        let keys = vec!["a".to_string(), "b".to_string()];
        let map = params!("a" => 1);
        let e = map.param_values(Some(&keys), &registry).unwrap_err();
        assert_eq!(e.data_error(), Some(&DataError::MissingKey("b".into())));
        assert!(map.param_values(None, &registry).unwrap().is_empty());
        assert!(().param_values(Some(&keys), &registry).is_err());
        let positional = vec![Value::from(1), Value::from("x")];
        assert_eq!(positional.param_values(Some(&keys), &registry).unwrap().len(), 2);
    }
}
