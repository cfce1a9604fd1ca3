use crate::{DataError, Record, RecordSchema, Result};
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// Cache of record descriptions, one entry per record type for the registry's whole life.
#[derive(Default, Debug)]
pub struct Registry {
    schemas: RwLock<HashMap<TypeId, Arc<RecordSchema>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized description of `R`.
    pub fn resolve<R: Record>(&self) -> Result<Arc<RecordSchema>> {
        let id = TypeId::of::<R>();
        if let Some(schema) = self
            .schemas
            .read()
            .map_err(|_| DataError::Schema("poisoned registry".into()))?
            .get(&id)
        {
            return Ok(schema.clone());
        }
        let schema = Arc::new(RecordSchema::build::<R>()?);
        let mut schemas = self
            .schemas
            .write()
            .map_err(|_| DataError::Schema("poisoned registry".into()))?;
        Ok(schemas.entry(id).or_insert(schema).clone())
    }

    /// Resolve `R` and check it can back a table: at least one field and one primary key.
    pub fn register<R: Record>(&self) -> Result<Arc<RecordSchema>> {
        let schema = self.resolve::<R>()?;
        if schema.is_empty() {
            return Err(DataError::Schema(format!(
                "`{}` has no mapped fields",
                schema.type_name()
            ))
            .into());
        }
        if schema.primary_keys().next().is_none() {
            return Err(DataError::Schema(format!(
                "`{}` has no primary key",
                schema.type_name()
            ))
            .into());
        }
        Ok(schema)
    }

    pub fn len(&self) -> usize {
        self.schemas.read().map(|v| v.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
