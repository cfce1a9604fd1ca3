use crate::{DataError, Result};
use std::fmt::{self, Display, Formatter};

/// Declared character length of a string column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    /// `length=N`, fixed width `char(N)`.
    Fixed(u32),
    /// `length=~N`, bounded `varchar(N)`.
    Variable(u32),
}

impl Length {
    pub fn value(&self) -> u32 {
        match self {
            Length::Fixed(v) | Length::Variable(v) => *v,
        }
    }
}

/// Where the column definition of a field comes from when it is not the driver's default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlOverride {
    /// `ddl=<raw>`: the raw text replaces the column type.
    Raw(String),
    /// Bare `ddl`: the record provides a hook returning the whole definition.
    Hook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl Display for Order {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        })
    }
}

/// Membership of a column in a named index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexField {
    pub index: String,
    pub column: String,
    pub order: Order,
    pub ordinal: i32,
}

/// Options parsed from a field annotation: `name;option[=value];...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTag {
    pub name: String,
    pub skip: bool,
    pub primary: bool,
    pub unique: bool,
    pub incr: bool,
    pub nullable: bool,
    pub length: Option<Length>,
    pub default: Option<String>,
    pub index: Vec<IndexField>,
    pub sqltype: Option<String>,
    pub ddl: Option<DdlOverride>,
}

fn schema_error(message: String) -> crate::Error {
    DataError::Schema(message).into()
}

impl FieldTag {
    /// Parse the annotation of the field `ident`. An empty name defaults to the identifier, `-`
    /// skips the field.
    pub fn parse(ident: &str, tag: &str) -> Result<FieldTag> {
        let mut segments = tag.split(';').map(str::trim);
        let name = segments.next().unwrap_or_default();
        if name == "-" {
            return Ok(FieldTag {
                name: ident.to_string(),
                skip: true,
                ..Default::default()
            });
        }
        let mut result = FieldTag {
            name: if name.is_empty() { ident } else { name }.to_string(),
            ..Default::default()
        };
        for segment in segments.filter(|v| !v.is_empty()) {
            let (key, value) = match segment.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (segment, None),
            };
            match (key, value) {
                ("primary", None) => result.primary = true,
                ("unique", None) => result.unique = true,
                ("incr", None) => result.incr = true,
                ("nullable", None) => result.nullable = true,
                ("length", Some(v)) => result.length = Some(parse_length(&result.name, v)?),
                ("default", Some(v)) => result.default = Some(v.to_string()),
                ("index", Some(v)) => result.index.extend(parse_index(&result.name, v)?),
                ("sqltype", Some(v)) => result.sqltype = Some(v.to_string()),
                ("ddl", None) => result.ddl = Some(DdlOverride::Hook),
                ("ddl", Some(v)) => result.ddl = Some(DdlOverride::Raw(v.to_string())),
                _ => {
                    return Err(schema_error(format!(
                        "unknown option `{}` on the field `{}`",
                        segment, result.name
                    )));
                }
            }
        }
        Ok(result)
    }
}

fn parse_length(field: &str, value: &str) -> Result<Length> {
    let (digits, variable) = match value.strip_prefix('~') {
        Some(rest) => (rest, true),
        None => (value, false),
    };
    let n = digits.parse::<u32>().map_err(|_| {
        schema_error(format!("bad field length `{}` on the field `{}`", value, field))
    })?;
    Ok(if variable {
        Length::Variable(n)
    } else {
        Length::Fixed(n)
    })
}

/// Parse `name[,asc|desc][,ordinal][|...]`. The order defaults to descending and the ordinal to 0.
pub fn parse_index(field: &str, value: &str) -> Result<Vec<IndexField>> {
    let mut result = Vec::new();
    for item in value.split('|').map(str::trim).filter(|v| !v.is_empty()) {
        let mut parts = item.split(',').map(str::trim);
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(schema_error(format!(
                "empty index name in `{}` on the field `{}`",
                item, field
            )));
        }
        let parts: Vec<&str> = std::iter::once(name)
            .chain(parts.filter(|v| !v.is_empty()))
            .collect();
        let (name, order, ordinal) = match parts.as_slice() {
            [name] => (*name, "desc", "0"),
            [name, second] if second.parse::<i32>().is_ok() => (*name, "desc", *second),
            [name, order] => (*name, *order, "0"),
            [name, order, ordinal] => (*name, *order, *ordinal),
            _ => return Err(schema_error(format!("bad index tag value `{}`", item))),
        };
        let order = match order.to_ascii_lowercase().as_str() {
            "asc" => Order::Asc,
            "desc" => Order::Desc,
            _ => return Err(schema_error(format!("bad index order type `{}`", item))),
        };
        let ordinal = ordinal
            .parse::<i32>()
            .map_err(|_| schema_error(format!("bad index ordinal `{}`", item)))?;
        result.push(IndexField {
            index: name.to_string(),
            column: field.to_string(),
            order,
            ordinal,
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorExt;

    #[test]
    fn name_defaults_to_ident() {
        let tag = FieldTag::parse("user_id", ";primary;incr").unwrap();
        assert_eq!(tag.name, "user_id");
        assert!(tag.primary);
        assert!(tag.incr);
        assert!(!tag.skip);
    }

    #[test]
    fn dash_skips() {
        assert!(FieldTag::parse("secret", "-").unwrap().skip);
    }

    #[test]
    fn options() {
        let tag = FieldTag::parse(
            "email",
            "mail;unique;nullable;length=~120;default='';sqltype=citext",
        )
        .unwrap();
        assert_eq!(tag.name, "mail");
        assert!(tag.unique && tag.nullable);
        assert_eq!(tag.length, Some(Length::Variable(120)));
        assert_eq!(tag.default.as_deref(), Some("''"));
        assert_eq!(tag.sqltype.as_deref(), Some("citext"));
        assert_eq!(
            FieldTag::parse("code", ";length=8").unwrap().length,
            Some(Length::Fixed(8))
        );
    }

    #[test]
    fn ddl_variants() {
        assert_eq!(
            FieldTag::parse("a", ";ddl").unwrap().ddl,
            Some(DdlOverride::Hook)
        );
        assert_eq!(
            FieldTag::parse("a", ";ddl=int4range").unwrap().ddl,
            Some(DdlOverride::Raw("int4range".into()))
        );
    }

    #[test]
    fn rejects_garbage() {
        let e = FieldTag::parse("a", ";primry").unwrap_err();
        assert!(matches!(e.data_error(), Some(DataError::Schema(..))));
        assert!(FieldTag::parse("a", ";length=abc").is_err());
        assert!(FieldTag::parse("a", ";length").is_err());
    }

    #[test]
    fn index_forms() {
        let fields = parse_index("c", "a|b,asc|c,2|d,asc,-1").unwrap();
        let summary: Vec<_> = fields
            .iter()
            .map(|f| (f.index.as_str(), f.order, f.ordinal))
            .collect();
        assert_eq!(
            summary,
            [
                ("a", Order::Desc, 0),
                ("b", Order::Asc, 0),
                ("c", Order::Desc, 2),
                ("d", Order::Asc, -1),
            ]
        );
        assert!(fields.iter().all(|f| f.column == "c"));
        assert!(parse_index("c", "a,asc,1,2").is_err());
        assert!(parse_index("c", "a,up").is_err());
        assert!(parse_index("c", "a,asc,x").is_err());
    }

    #[test]
    fn index_needs_a_name() {
        for value in [",asc", " ,desc,1", "a|,asc"] {
            let e = parse_index("c", value).unwrap_err();
            assert!(matches!(e.data_error(), Some(DataError::Schema(..))), "{value}");
        }
        assert!(FieldTag::parse("a", ";index=,asc").is_err());
    }
}
