mod support {
    pub mod recorder;
}

#[cfg(test)]
mod tests {
    use crate::support::recorder::{DollarWriter, Note, Person, Pet};
    use indoc::indoc;
    use keel_core::{
        AsValue, DataError, ErrorExt, FieldDecl, FieldDefinition, GenericSqlWriter, Record,
        Registry, Result, SchemaBuilder, SqlWriter, Value, bad_path, create_table_sql,
        create_table_statements, drop_table_sql, table_definition,
    };

    #[derive(Default)]
    struct Event {
        id: i64,
        kind: String,
        at: i64,
        span: String,
    }

    impl Event {
        fn ddl_span() -> FieldDefinition {
            let mut definition = FieldDefinition::new("ignored", "tsrange");
            definition.check_and("NOT isempty(span)");
            definition
        }
    }

    impl Record for Event {
        fn table_name() -> &'static str {
            "event"
        }
        fn describe(builder: &mut SchemaBuilder) -> Result<()> {
            builder
                .field(FieldDecl {
                    index: 0,
                    ident: "id",
                    tag: ";primary;sqltype=bigint",
                    prototype: i64::as_empty_value(),
                    nullable: false,
                    ddl_hook: None,
                })?
                .field(FieldDecl {
                    index: 1,
                    ident: "kind",
                    tag: ";length=8;default='info';index=by_kind_at_unique,asc,1|by_kind",
                    prototype: String::as_empty_value(),
                    nullable: false,
                    ddl_hook: None,
                })?
                .field(FieldDecl {
                    index: 2,
                    ident: "at",
                    tag: ";nullable;index=by_kind_at_unique,desc,0",
                    prototype: i64::as_empty_value(),
                    nullable: false,
                    ddl_hook: None,
                })?
                .field(FieldDecl {
                    index: 3,
                    ident: "span",
                    tag: ";ddl",
                    prototype: String::as_empty_value(),
                    nullable: false,
                    ddl_hook: Some(Self::ddl_span),
                })?;
            Ok(())
        }
        fn value_at(&self, path: &[usize]) -> Result<Value> {
            match path {
                [0] => Ok(self.id.as_value()),
                [1] => Ok(self.kind.clone().as_value()),
                [2] => Ok(self.at.as_value()),
                [3] => Ok(self.span.clone().as_value()),
                _ => Err(bad_path::<Self>(path)),
            }
        }
        fn assign_at(&mut self, path: &[usize], value: Value) -> Result<()> {
            match path {
                [0] => self.id = AsValue::try_from_value(value)?,
                [1] => self.kind = AsValue::try_from_value(value)?,
                [2] => self.at = AsValue::try_from_value(value)?,
                [3] => self.span = AsValue::try_from_value(value)?,
                _ => return Err(bad_path::<Self>(path)),
            }
            Ok(())
        }
    }

    /// Asks for a ddl hook without providing one.
    #[derive(Default)]
    struct Range {
        id: i64,
    }

    impl Record for Range {
        fn table_name() -> &'static str {
            "range"
        }
        fn describe(builder: &mut SchemaBuilder) -> Result<()> {
            builder.field(FieldDecl {
                index: 0,
                ident: "id",
                tag: ";primary;ddl",
                prototype: i64::as_empty_value(),
                nullable: false,
                ddl_hook: None,
            })?;
            Ok(())
        }
        fn value_at(&self, path: &[usize]) -> Result<Value> {
            match path {
                [0] => Ok(self.id.as_value()),
                _ => Err(bad_path::<Self>(path)),
            }
        }
        fn assign_at(&mut self, path: &[usize], value: Value) -> Result<()> {
            match path {
                [0] => self.id = AsValue::try_from_value(value)?,
                _ => return Err(bad_path::<Self>(path)),
            }
            Ok(())
        }
    }

    #[test]
    fn missing_ddl_hook() {
        let registry = Registry::new();
        let error = create_table_sql::<Range>(&GenericSqlWriter, &registry).unwrap_err();
        assert!(matches!(error.data_error(), Some(DataError::Schema(..))));
        assert!(error.to_string().contains("ddl hook"));
    }

    #[test]
    fn create_table() {
        let registry = Registry::new();
        let sql = create_table_sql::<Person>(&GenericSqlWriter, &registry).unwrap();
        assert_eq!(
            sql,
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS "person" (
                "id" BIGINT NOT NULL,
                "full_name" VARCHAR(64) NOT NULL,
                "age" INTEGER,
                PRIMARY KEY ("id")
                );
                CREATE INDEX IF NOT EXISTS "by_name" ON "person" ("full_name" ASC);"#}
        );
    }

    #[test]
    fn overrides_and_indexes() {
        let registry = Registry::new();
        let statements = create_table_statements::<Event>(&DollarWriter, &registry).unwrap();
        assert_eq!(
            statements,
            [
                indoc! {r#"
                    CREATE TABLE IF NOT EXISTS "event" (
                    "id" bigint NOT NULL,
                    "kind" CHAR(8) NOT NULL DEFAULT 'info',
                    "at" BIGINT,
                    "span" tsrange NOT NULL CHECK (NOT isempty(span)),
                    PRIMARY KEY ("id")
                    );"#},
                r#"CREATE INDEX IF NOT EXISTS "by_kind" ON "event" ("kind" DESC);"#,
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "by_kind_at_unique" ON "event" ("at" DESC, "kind" ASC);"#,
            ]
        );
        let table = table_definition::<Event>(&DollarWriter, &registry).unwrap();
        assert_eq!(table.fields[3].name, "span");
        assert_eq!(table.primary_keys().count(), 1);
    }

    #[test]
    fn drop_table() {
        assert_eq!(
            drop_table_sql::<Pet>(&GenericSqlWriter),
            r#"DROP TABLE IF EXISTS "pet";"#
        );
    }

    #[test]
    fn requires_primary_key() {
        let registry = Registry::new();
        let error = create_table_sql::<Note>(&GenericSqlWriter, &registry).unwrap_err();
        assert!(matches!(error.data_error(), Some(DataError::Schema(..))));
        // Resolving alone is fine, only a table needs a key
        assert_eq!(registry.resolve::<Note>().unwrap().len(), 1);
    }

    #[test]
    fn registry_memoizes() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        let a = registry.resolve::<Person>().unwrap();
        let b = registry.resolve::<Person>().unwrap();
        assert!(std::sync::Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        let field = a.field("full_name").unwrap();
        assert_eq!(field.ident, "name");
        assert_eq!(&*field.path, [1]);
        assert!(a.field("name").is_none());
    }

    #[test]
    fn transaction_statements() {
        let writer = DollarWriter;
        let mut out = String::new();
        writer.write_transaction_begin(
            &mut out,
            &keel_core::TxOptions::read_only().isolation(keel_core::Isolation::Serializable),
        );
        assert_eq!(out, "BEGIN ISOLATION LEVEL SERIALIZABLE READ ONLY;");
        let mut out = String::new();
        writer.write_savepoint(&mut out, "sp");
        assert_eq!(out, r#"SAVEPOINT "sp";"#);
        let mut out = String::new();
        writer.write_rollback_to_savepoint(&mut out, "sp_BEGIN");
        assert_eq!(out, r#"ROLLBACK TO SAVEPOINT "sp_BEGIN";"#);
        let mut out = String::new();
        writer.write_create_extension(&mut out, "uuid-ossp");
        assert_eq!(out, r#"CREATE EXTENSION IF NOT EXISTS "uuid-ossp";"#);
    }
}
