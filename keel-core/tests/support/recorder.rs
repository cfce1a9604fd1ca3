use keel_core::{
    AsValue, Connection, DataError, Decode, Driver, FieldDecl, Params, Record, Registry, Result,
    RowLabeled, RowSet, RowsAffected, SchemaBuilder, SqlWriter, Value, bad_path, decode_record,
    record_params,
};
use std::{
    collections::VecDeque,
    future::Future,
    sync::{Arc, Mutex},
};

/// Positional placeholders as `$1`, `$2`, ...
#[derive(Default, Debug, Clone, Copy)]
pub struct DollarWriter;

impl SqlWriter for DollarWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
    fn write_placeholder(&self, out: &mut String, ordinal: usize, _name: &str) {
        out.push('$');
        out.push_str(&(ordinal + 1).to_string());
    }
}

#[derive(Default, Debug)]
struct State {
    statements: Vec<(String, Vec<Value>)>,
    results: VecDeque<RowSet>,
    fail_on: Option<String>,
    connections: usize,
}

/// In-memory driver writing down every statement it receives.
#[derive(Default, Debug, Clone)]
pub struct Recorder {
    state: Arc<Mutex<State>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every statement received so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .statements
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn last_args(&self) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .statements
            .last()
            .map(|(_, args)| args.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().statements.clear();
    }

    /// Result returned by the next query, queries without a queued result return no rows.
    pub fn push_result(&self, labels: &[&str], rows: Vec<Vec<Value>>) {
        self.state.lock().unwrap().results.push_back(RowSet {
            labels: labels.iter().map(|v| v.to_string()).collect(),
            rows: rows.into_iter().map(Into::into).collect(),
        });
    }

    /// Statements containing `pattern` fail from now on.
    pub fn fail_on(&self, pattern: &str) {
        self.state.lock().unwrap().fail_on = Some(pattern.into());
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }

    fn record(&self, sql: &str, args: Vec<Value>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.statements.push((sql.to_string(), args));
        if let Some(pattern) = &state.fail_on
            && sql.contains(pattern.as_str())
        {
            return Err(keel_core::Error::msg(format!("refusing `{}`", sql)));
        }
        Ok(())
    }

    fn next_result(&self) -> RowSet {
        self.state
            .lock()
            .unwrap()
            .results
            .pop_front()
            .unwrap_or_default()
    }
}

pub struct RecorderConnection {
    driver: Recorder,
}

impl Driver for Recorder {
    type Connection = RecorderConnection;
    type SqlWriter = DollarWriter;

    const NAME: &'static str = "recorder";

    fn sql_writer(&self) -> DollarWriter {
        DollarWriter
    }

    fn check_url(&self, url: &str) -> Result<()> {
        if !url.starts_with("memory://") {
            return Err(keel_core::Error::msg(format!("unexpected url `{}`", url)));
        }
        Ok(())
    }

    fn connect(&self, _url: &str) -> impl Future<Output = Result<RecorderConnection>> + Send {
        let driver = self.clone();
        async move {
            driver.state.lock().unwrap().connections += 1;
            Ok(RecorderConnection { driver })
        }
    }
}

impl Connection for RecorderConnection {
    type Prepared = String;

    async fn query(&mut self, sql: &str, args: Vec<Value>) -> Result<RowSet> {
        self.driver.record(sql, args)?;
        Ok(self.driver.next_result())
    }

    async fn execute(&mut self, sql: &str, args: Vec<Value>) -> Result<RowsAffected> {
        self.driver.record(sql, args)?;
        Ok(RowsAffected { rows_affected: 1 })
    }

    async fn batch(&mut self, sql: &str) -> Result<()> {
        self.driver.record(sql, Vec::new())
    }

    async fn prepare(&mut self, sql: &str) -> Result<String> {
        self.driver.record(&format!("PREPARE {}", sql), Vec::new())?;
        Ok(sql.to_string())
    }

    async fn query_prepared(&mut self, prepared: &String, args: Vec<Value>) -> Result<RowSet> {
        self.query(prepared, args).await
    }

    async fn execute_prepared(&mut self, prepared: &String, args: Vec<Value>) -> Result<RowsAffected> {
        self.execute(prepared, args).await
    }

    fn is_closed(&self) -> bool {
        false
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
}

impl Record for Person {
    fn table_name() -> &'static str {
        "person"
    }
    fn describe(builder: &mut SchemaBuilder) -> Result<()> {
        builder
            .field(FieldDecl {
                index: 0,
                ident: "id",
                tag: "id;primary;incr",
                prototype: i64::as_empty_value(),
                nullable: i64::NULLABLE,
                ddl_hook: None,
            })?
            .field(FieldDecl {
                index: 1,
                ident: "name",
                tag: "full_name;length=~64;index=by_name,asc",
                prototype: String::as_empty_value(),
                nullable: String::NULLABLE,
                ddl_hook: None,
            })?
            .field(FieldDecl {
                index: 2,
                ident: "age",
                tag: "",
                prototype: Option::<i32>::as_empty_value(),
                nullable: Option::<i32>::NULLABLE,
                ddl_hook: None,
            })?;
        Ok(())
    }
    fn value_at(&self, path: &[usize]) -> Result<Value> {
        match path {
            [0] => Ok(self.id.as_value()),
            [1] => Ok(self.name.clone().as_value()),
            [2] => Ok(self.age.as_value()),
            _ => Err(bad_path::<Self>(path)),
        }
    }
    fn assign_at(&mut self, path: &[usize], value: Value) -> Result<()> {
        match path {
            [0] => self.id = AsValue::try_from_value(value)?,
            [1] => self.name = AsValue::try_from_value(value)?,
            [2] => self.age = AsValue::try_from_value(value)?,
            _ => return Err(bad_path::<Self>(path)),
        }
        Ok(())
    }
}

impl Decode for Person {
    fn decode(row: RowLabeled, registry: &Registry) -> Result<Self> {
        decode_record(row, registry)
    }
}

impl Params for Person {
    fn param_values(&self, keys: Option<&[String]>, registry: &Registry) -> Result<Vec<Value>> {
        record_params(self, keys, registry)
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Pet {
    pub pet_id: i64,
    pub owner: i64,
}

impl Record for Pet {
    fn table_name() -> &'static str {
        "pet"
    }
    fn describe(builder: &mut SchemaBuilder) -> Result<()> {
        builder
            .field(FieldDecl {
                index: 0,
                ident: "pet_id",
                tag: ";primary",
                prototype: i64::as_empty_value(),
                nullable: false,
                ddl_hook: None,
            })?
            .field(FieldDecl {
                index: 1,
                ident: "owner",
                tag: "owner_id",
                prototype: i64::as_empty_value(),
                nullable: false,
                ddl_hook: None,
            })?;
        Ok(())
    }
    fn value_at(&self, path: &[usize]) -> Result<Value> {
        match path {
            [0] => Ok(self.pet_id.as_value()),
            [1] => Ok(self.owner.as_value()),
            _ => Err(bad_path::<Self>(path)),
        }
    }
    fn assign_at(&mut self, path: &[usize], value: Value) -> Result<()> {
        match path {
            [0] => self.pet_id = AsValue::try_from_value(value)?,
            [1] => self.owner = AsValue::try_from_value(value)?,
            _ => return Err(bad_path::<Self>(path)),
        }
        Ok(())
    }
}

/// No primary key, it cannot back a table.
#[derive(Default, Debug)]
pub struct Note {
    pub text: String,
}

impl Record for Note {
    fn table_name() -> &'static str {
        "note"
    }
    fn describe(builder: &mut SchemaBuilder) -> Result<()> {
        builder.field(FieldDecl {
            index: 0,
            ident: "text",
            tag: "",
            prototype: String::as_empty_value(),
            nullable: false,
            ddl_hook: None,
        })?;
        Ok(())
    }
    fn value_at(&self, path: &[usize]) -> Result<Value> {
        match path {
            [0] => Ok(self.text.clone().as_value()),
            _ => Err(bad_path::<Self>(path)),
        }
    }
    fn assign_at(&mut self, path: &[usize], value: Value) -> Result<()> {
        match path {
            [0] => self.text = AsValue::try_from_value(value)?,
            _ => return Err(DataError::Schema("no such field".into()).into()),
        }
        Ok(())
    }
}
