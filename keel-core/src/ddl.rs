use crate::{
    DataError, DdlOverride, FieldDefinition, Record, Registry, Result, SqlWriter, TableDefinition,
};

/// Build the table definition of `R`: per field the `ddl` override, or the hook, or the driver's
/// definition, then the tag options on top.
pub fn table_definition<R: Record>(
    writer: &dyn SqlWriter,
    registry: &Registry,
) -> Result<TableDefinition> {
    let schema = registry.register::<R>()?;
    let mut table = TableDefinition {
        name: schema.table().to_string(),
        ..Default::default()
    };
    for field in schema.fields() {
        let mut definition = match (&field.tag.ddl, field.ddl_hook) {
            (Some(DdlOverride::Raw(sql_type)), _) => {
                let mut definition = FieldDefinition::new(field.name.clone(), sql_type.clone());
                definition.nullable = field.nullable;
                definition
            }
            (Some(DdlOverride::Hook), Some(hook)) => hook(),
            (Some(DdlOverride::Hook), None) => {
                return Err(DataError::Schema(format!(
                    "the field `{}` of `{}` asks for a ddl hook but provides none",
                    field.ident,
                    schema.type_name()
                ))
                .into());
            }
            _ => writer.column_definition(field)?,
        };
        definition.name = field.name.clone();
        if field.tag.nullable {
            definition.nullable = true;
        }
        if field.tag.unique {
            definition.unique = true;
        }
        if field.tag.primary {
            definition.primary_key = true;
        }
        if let Some(default) = &field.tag.default {
            definition.default = Some(default.clone());
        }
        definition.indexes.extend(field.tag.index.iter().cloned());
        for index in &definition.indexes {
            table
                .indexes
                .entry(index.index.clone())
                .or_default()
                .fields
                .push(index.clone());
        }
        table.fields.push(definition);
    }
    Ok(table)
}

/// The `CREATE TABLE` statement followed by one `CREATE INDEX` per index, sorted by index name.
pub fn create_table_statements<R: Record>(
    writer: &dyn SqlWriter,
    registry: &Registry,
) -> Result<Vec<String>> {
    let table = table_definition::<R>(writer, registry)?;
    let mut result = Vec::with_capacity(1 + table.indexes.len());
    let mut out = String::new();
    writer.write_create_table(&mut out, &table);
    result.push(out);
    for (name, index) in &table.indexes {
        let mut out = String::new();
        writer.write_create_index(&mut out, &table.name, name, index);
        result.push(out);
    }
    Ok(result)
}

pub fn create_table_sql<R: Record>(writer: &dyn SqlWriter, registry: &Registry) -> Result<String> {
    Ok(create_table_statements::<R>(writer, registry)?.join("\n"))
}

pub fn drop_table_sql<R: Record>(writer: &dyn SqlWriter) -> String {
    let mut out = String::new();
    writer.write_drop_table(&mut out, R::table_name());
    out
}
