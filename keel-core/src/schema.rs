use crate::{DataError, FieldDefinition, FieldTag, Registry, Result, Value};
use std::{any, collections::HashMap, sync::Arc};

/// A struct mapped to a table, usually implemented through `#[derive(Record)]`.
///
/// The description is explicit: `describe` lists every field with its annotation and type
/// prototype, `value_at` / `assign_at` read and write a field by its index path (one index per
/// level of `flatten` embedding).
pub trait Record: Default + Send + Sync + 'static {
    /// Name of the backing table.
    fn table_name() -> &'static str;
    /// Declare the fields of this record.
    fn describe(builder: &mut SchemaBuilder) -> Result<()>;
    /// Read the field at `path`.
    fn value_at(&self, path: &[usize]) -> Result<Value>;
    /// Write the field at `path`.
    fn assign_at(&mut self, path: &[usize], value: Value) -> Result<()>;
}

/// Declaration of a single field, as passed to [`SchemaBuilder::field`].
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub index: usize,
    pub ident: &'static str,
    pub tag: &'static str,
    pub prototype: Value,
    pub nullable: bool,
    pub ddl_hook: Option<fn() -> FieldDefinition>,
}

/// Resolved metadata of a mapped column.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub name: String,
    pub ident: &'static str,
    pub path: Box<[usize]>,
    pub tag: FieldTag,
    pub prototype: Value,
    pub nullable: bool,
    pub ddl_hook: Option<fn() -> FieldDefinition>,
}

#[derive(Default, Debug)]
pub struct SchemaBuilder {
    prefix: Vec<usize>,
    fields: Vec<FieldMeta>,
}

impl SchemaBuilder {
    pub fn field(&mut self, decl: FieldDecl) -> Result<&mut Self> {
        let tag = FieldTag::parse(decl.ident, decl.tag)?;
        if tag.skip {
            return Ok(self);
        }
        let mut path = self.prefix.clone();
        path.push(decl.index);
        self.fields.push(FieldMeta {
            name: tag.name.clone(),
            ident: decl.ident,
            path: path.into(),
            tag,
            prototype: decl.prototype,
            nullable: decl.nullable,
            ddl_hook: decl.ddl_hook,
        });
        Ok(self)
    }

    /// Embed the fields of `R` as if they were declared here.
    pub fn flatten<R: Record>(&mut self, index: usize) -> Result<&mut Self> {
        self.prefix.push(index);
        let result = R::describe(self);
        self.prefix.pop();
        result?;
        Ok(self)
    }
}

/// Flat name index of a record type.
#[derive(Debug)]
pub struct RecordSchema {
    type_name: &'static str,
    table: &'static str,
    fields: Vec<FieldMeta>,
    by_name: HashMap<String, usize>,
}

impl RecordSchema {
    pub fn build<R: Record>() -> Result<RecordSchema> {
        let type_name = any::type_name::<R>();
        let mut builder = SchemaBuilder::default();
        R::describe(&mut builder)?;
        let mut by_name = HashMap::with_capacity(builder.fields.len());
        for (i, field) in builder.fields.iter().enumerate() {
            if by_name.insert(field.name.clone(), i).is_some() {
                return Err(DataError::Schema(format!(
                    "duplicate column `{}` in `{}`",
                    field.name, type_name
                ))
                .into());
            }
        }
        Ok(RecordSchema {
            type_name,
            table: R::table_name(),
            fields: builder.fields,
            by_name,
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.by_name.get(name).map(|i| &self.fields[*i])
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.iter().filter(|f| {
            f.tag.primary || f.ddl_hook.is_some_and(|hook| hook().primary_key)
        })
    }
}

/// Object safe view of a record, used where the concrete type is erased.
pub trait DynRecord: Send {
    fn dyn_schema(&self, registry: &Registry) -> Result<Arc<RecordSchema>>;
    fn dyn_assign(&mut self, path: &[usize], value: Value) -> Result<()>;
}

impl<R: Record> DynRecord for R {
    fn dyn_schema(&self, registry: &Registry) -> Result<Arc<RecordSchema>> {
        registry.resolve::<R>()
    }
    fn dyn_assign(&mut self, path: &[usize], value: Value) -> Result<()> {
        self.assign_at(path, value)
    }
}

/// Error for a path that does not point to a field of `R`.
pub fn bad_path<R: Record>(path: &[usize]) -> crate::Error {
    DataError::Schema(format!(
        "no field at {:?} in `{}`",
        path,
        any::type_name::<R>()
    ))
    .into()
}
