use keel_core::{DataError, FieldDefinition, FieldMeta, Length, Result, SqlWriter, Value};
use std::fmt::Write;

/// Longest declared length accepted for `char(N)` / `varchar(N)`, longer ones become `text`.
pub const MAX_STRING_LENGTH: u32 = 65535;

#[derive(Default, Debug, Clone, Copy)]
pub struct PostgresSqlWriter;

impl PostgresSqlWriter {
    /// `numeric(precision)` constrained to `[min, max)`.
    fn write_bounded_numeric(
        &self,
        out: &mut String,
        field: &FieldMeta,
        definition: &mut FieldDefinition,
        precision: u32,
        min: i128,
        max: u128,
    ) {
        let _ = write!(out, "numeric({})", precision);
        let mut column = String::new();
        self.write_identifier_quoted(&mut column, &field.name);
        definition
            .check_and(format!("{} < {}", column, max))
            .check_and(format!("{} >= {}", column, min));
    }
}

impl SqlWriter for PostgresSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_placeholder(&self, out: &mut String, ordinal: usize, _name: &str) {
        let _ = write!(out, "${}", ordinal + 1);
    }

    fn write_column_type(
        &self,
        out: &mut String,
        field: &FieldMeta,
        definition: &mut FieldDefinition,
    ) -> Result<()> {
        match &field.prototype {
            Value::Boolean(..) => out.push_str("boolean"),
            Value::Int8(..) => self.write_bounded_numeric(out, field, definition, 3, -128, 128),
            Value::Int16(..) => out.push_str("smallint"),
            Value::Int32(..) => out.push_str("integer"),
            Value::Int64(..) => out.push_str("bigint"),
            Value::UInt8(..) => self.write_bounded_numeric(out, field, definition, 3, 0, 1 << 8),
            Value::UInt16(..) => self.write_bounded_numeric(out, field, definition, 5, 0, 1 << 16),
            Value::UInt32(..) => self.write_bounded_numeric(out, field, definition, 10, 0, 1 << 32),
            Value::UInt64(..) => self.write_bounded_numeric(out, field, definition, 20, 0, 1 << 64),
            Value::Float32(..) => out.push_str("real"),
            Value::Float64(..) => out.push_str("double precision"),
            Value::Decimal(..) => out.push_str("numeric"),
            Value::Varchar(..) => match field.tag.length {
                Some(Length::Fixed(n)) if (1..=MAX_STRING_LENGTH).contains(&n) => {
                    let _ = write!(out, "char({})", n);
                }
                Some(Length::Variable(n)) if (1..=MAX_STRING_LENGTH).contains(&n) => {
                    let _ = write!(out, "varchar({})", n);
                }
                _ => out.push_str("text"),
            },
            Value::Blob(..) => out.push_str("bytea"),
            Value::Date(..) => out.push_str("date"),
            Value::Timestamp(..) => out.push_str("timestamp"),
            Value::TimestampWithTimezone(..) => out.push_str("timestamptz"),
            Value::Uuid(..) => out.push_str("uuid"),
            Value::Hstore(..) => out.push_str("hstore"),
            Value::Json(..) => out.push_str("jsonb"),
            Value::Null => {
                return Err(DataError::Schema(format!(
                    "no postgres type for the field `{}`, use `sqltype=` or `ddl=`",
                    field.name
                ))
                .into());
            }
        }
        Ok(())
    }

    fn incremental_type(&self, sql_type: &str) -> Option<&'static str> {
        match sql_type {
            "smallint" => Some("smallserial"),
            "integer" => Some("serial"),
            "bigint" => Some("bigserial"),
            _ => None,
        }
    }
}
