use crate::IndexField;
use std::collections::BTreeMap;

/// Column definition as it will be rendered in a `CREATE TABLE` statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub sql_type: String,
    pub primary_key: bool,
    pub default: Option<String>,
    pub check: Option<String>,
    pub nullable: bool,
    pub unique: bool,
    pub indexes: Vec<IndexField>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            ..Default::default()
        }
    }

    /// Combine `condition` with the current check as `((current) AND (condition))`.
    pub fn check_and(&mut self, condition: impl Into<String>) -> &mut Self {
        let condition = condition.into();
        self.check = Some(match self.check.take() {
            Some(current) => format!("(({}) AND ({}))", current, condition),
            None => condition,
        });
        self
    }

    /// Combine `condition` with the current check as `((current) OR (condition))`.
    pub fn check_or(&mut self, condition: impl Into<String>) -> &mut Self {
        let condition = condition.into();
        self.check = Some(match self.check.take() {
            Some(current) => format!("(({}) OR ({}))", current, condition),
            None => condition,
        });
        self
    }

    pub fn append_index(&mut self, field: IndexField) -> &mut Self {
        self.indexes.push(field);
        self
    }
}

/// Fields of one named index, in declaration order until sorted by ordinal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexInfo {
    pub fields: Vec<IndexField>,
}

impl IndexInfo {
    /// True when the index name ends in `unique`.
    pub fn is_unique(name: &str) -> bool {
        name.ends_with("unique")
    }

    /// Fields ordered by ordinal, equal ordinals keep declaration order.
    pub fn sorted(&self) -> Vec<&IndexField> {
        let mut fields: Vec<_> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.ordinal);
        fields
    }
}

/// Everything needed to create a table and its indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
    pub indexes: BTreeMap<String, IndexInfo>,
}

impl TableDefinition {
    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.primary_key)
    }
}
