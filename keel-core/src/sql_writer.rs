use crate::{
    DataError, FieldDefinition, FieldMeta, IndexInfo, Length, Result, TableDefinition, TxOptions,
    Value, separated_by,
};
use std::fmt::Write;

/// Dialect printer: placeholders, column types and the DDL / transaction statements.
///
/// Every statement method appends to `out`, separating it from previous content with a newline.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', "\"\"");
        out.push('"');
    }

    /// Positional marker for the `ordinal`-th (zero based) placeholder of a query.
    fn write_placeholder(&self, out: &mut String, _ordinal: usize, _name: &str) {
        out.push('?');
    }

    /// Render the SQL type of `field`, range checks go into `definition`.
    fn write_column_type(
        &self,
        out: &mut String,
        field: &FieldMeta,
        _definition: &mut FieldDefinition,
    ) -> Result<()> {
        match &field.prototype {
            Value::Boolean(..) => out.push_str("BOOLEAN"),
            Value::Int8(..) => out.push_str("TINYINT"),
            Value::Int16(..) => out.push_str("SMALLINT"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::UInt8(..) => out.push_str("UTINYINT"),
            Value::UInt16(..) => out.push_str("USMALLINT"),
            Value::UInt32(..) => out.push_str("UINTEGER"),
            Value::UInt64(..) => out.push_str("UBIGINT"),
            Value::Float32(..) => out.push_str("FLOAT"),
            Value::Float64(..) => out.push_str("DOUBLE"),
            Value::Decimal(..) => out.push_str("DECIMAL"),
            Value::Varchar(..) => match field.tag.length {
                Some(Length::Fixed(n)) => {
                    let _ = write!(out, "CHAR({})", n);
                }
                Some(Length::Variable(n)) => {
                    let _ = write!(out, "VARCHAR({})", n);
                }
                None => out.push_str("VARCHAR"),
            },
            Value::Blob(..) => out.push_str("BLOB"),
            Value::Date(..) => out.push_str("DATE"),
            Value::Timestamp(..) => out.push_str("TIMESTAMP"),
            Value::TimestampWithTimezone(..) => out.push_str("TIMESTAMP WITH TIME ZONE"),
            Value::Uuid(..) => out.push_str("UUID"),
            Value::Json(..) => out.push_str("JSON"),
            Value::Null | Value::Hstore(..) => {
                return Err(DataError::Schema(format!(
                    "no column type for the field `{}` of type {:?}",
                    field.name, field.prototype
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Auto incrementing replacement of an integer column type.
    fn incremental_type(&self, _sql_type: &str) -> Option<&'static str> {
        None
    }

    /// Column definition derived from the field type and its `sqltype` / `incr` options.
    fn column_definition(&self, field: &FieldMeta) -> Result<FieldDefinition> {
        let mut definition = FieldDefinition::new(field.name.clone(), "");
        definition.nullable = field.nullable;
        match field.tag.sqltype.as_deref().map(str::trim) {
            Some(sql_type) if !sql_type.is_empty() => definition.sql_type = sql_type.into(),
            _ => {
                let mut sql_type = String::new();
                self.write_column_type(&mut sql_type, field, &mut definition)?;
                definition.sql_type = sql_type;
            }
        }
        if field.tag.incr {
            if let Some(incremental) = self.incremental_type(&definition.sql_type) {
                definition.sql_type = incremental.into();
            }
        }
        Ok(definition)
    }

    /// Emit CREATE TABLE with the columns and the primary key constraint.
    fn write_create_table(&self, out: &mut String, table: &TableDefinition) {
        out.reserve(64 + table.fields.len() * 48);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("CREATE TABLE IF NOT EXISTS ");
        self.write_identifier_quoted(out, &table.name);
        out.push_str(" (\n");
        for field in &table.fields {
            self.write_create_table_column_fragment(out, field);
            out.push_str(",\n");
        }
        out.push_str("PRIMARY KEY (");
        separated_by(
            out,
            table.primary_keys(),
            |out, v| self.write_identifier_quoted(out, &v.name),
            ", ",
        );
        out.push_str(")\n);");
    }

    /// Emit single column definition fragment.
    fn write_create_table_column_fragment(&self, out: &mut String, field: &FieldDefinition) {
        self.write_identifier_quoted(out, &field.name);
        out.push(' ');
        out.push_str(&field.sql_type);
        if field.unique {
            out.push_str(" UNIQUE");
        }
        if !field.nullable {
            out.push_str(" NOT NULL");
        }
        if let Some(check) = &field.check {
            let _ = write!(out, " CHECK ({})", check);
        }
        if let Some(default) = &field.default {
            let _ = write!(out, " DEFAULT {}", default);
        }
    }

    /// Emit CREATE INDEX, fields sorted by ordinal.
    fn write_create_index(&self, out: &mut String, table: &str, name: &str, index: &IndexInfo) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("CREATE ");
        if IndexInfo::is_unique(name) {
            out.push_str("UNIQUE ");
        }
        out.push_str("INDEX IF NOT EXISTS ");
        self.write_identifier_quoted(out, name);
        out.push_str(" ON ");
        self.write_identifier_quoted(out, table);
        out.push_str(" (");
        separated_by(
            out,
            index.sorted(),
            |out, v| {
                self.write_identifier_quoted(out, &v.column);
                let _ = write!(out, " {}", v.order);
            },
            ", ",
        );
        out.push_str(");");
    }

    /// Emit DROP TABLE statement.
    fn write_drop_table(&self, out: &mut String, table: &str) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("DROP TABLE IF EXISTS ");
        self.write_identifier_quoted(out, table);
        out.push(';');
    }

    /// Emit BEGIN statement with the requested modes.
    fn write_transaction_begin(&self, out: &mut String, options: &TxOptions) {
        out.push_str("BEGIN");
        if let Some(isolation) = options.isolation {
            let _ = write!(out, " ISOLATION LEVEL {}", isolation);
        }
        if options.read_only {
            out.push_str(" READ ONLY");
        }
        out.push(';');
    }

    /// Emit COMMIT statement.
    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT;");
    }

    /// Emit ROLLBACK statement.
    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK;");
    }

    fn write_savepoint(&self, out: &mut String, name: &str) {
        out.push_str("SAVEPOINT ");
        self.write_identifier_quoted(out, name);
        out.push(';');
    }

    fn write_rollback_to_savepoint(&self, out: &mut String, name: &str) {
        out.push_str("ROLLBACK TO SAVEPOINT ");
        self.write_identifier_quoted(out, name);
        out.push(';');
    }

    fn write_create_extension(&self, out: &mut String, name: &str) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("CREATE EXTENSION IF NOT EXISTS ");
        self.write_identifier_quoted(out, name);
        out.push(';');
    }
}

/// Fallback generic SQL writer.
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;
impl GenericSqlWriter {
    pub fn new() -> Self {
        Self
    }
}
impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
