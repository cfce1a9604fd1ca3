use crate::{
    ValueHolder,
    util::{collect_rows, statement_labels},
};
use keel_core::{Connection, Error, Result, RowSet, RowsAffected, Value, truncate_long};
use std::pin::pin;
use tokio_postgres::{Client, Statement};

/// A single client, the socket task runs on the tokio runtime that opened it.
pub struct PostgresConnection {
    pub(crate) client: Client,
}

fn holders(args: Vec<Value>) -> impl ExactSizeIterator<Item = ValueHolder> {
    args.into_iter().map(ValueHolder)
}

fn log_error(e: tokio_postgres::Error, context: impl FnOnce() -> String) -> Error {
    let e = Error::new(e).context(context());
    log::error!("{:#}", e);
    e
}

impl PostgresConnection {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn prepare_statement(&self, sql: &str) -> Result<Statement> {
        self.client.prepare(sql).await.map_err(|e| {
            log_error(e, || {
                format!("While preparing the query:\n{}", truncate_long!(sql))
            })
        })
    }

    async fn query_statement(&self, statement: &Statement, args: Vec<Value>) -> Result<RowSet> {
        let stream = self
            .client
            .query_raw(statement, holders(args))
            .await
            .map_err(|e| log_error(e, || "While running the query".to_string()))?;
        collect_rows(statement, pin!(stream)).await
    }

    async fn execute_statement(
        &self,
        statement: &Statement,
        args: Vec<Value>,
    ) -> Result<RowsAffected> {
        let rows_affected = self
            .client
            .execute_raw(statement, holders(args))
            .await
            .map_err(|e| log_error(e, || "While executing the statement".to_string()))?;
        Ok(RowsAffected { rows_affected })
    }
}

impl Connection for PostgresConnection {
    type Prepared = Statement;

    async fn query(&mut self, sql: &str, args: Vec<Value>) -> Result<RowSet> {
        let statement = self.prepare_statement(sql).await?;
        if statement.columns().is_empty() {
            self.execute_statement(&statement, args).await?;
            return Ok(RowSet {
                labels: statement_labels(&statement),
                rows: Vec::new(),
            });
        }
        self.query_statement(&statement, args).await
    }

    async fn execute(&mut self, sql: &str, args: Vec<Value>) -> Result<RowsAffected> {
        if args.is_empty() {
            // Multiple statements are only accepted by the simple protocol
            let rows_affected = self
                .client
                .simple_query(sql)
                .await
                .map_err(|e| {
                    log_error(e, || {
                        format!("While executing the query:\n{}", truncate_long!(sql))
                    })
                })?
                .iter()
                .map(|m| match m {
                    tokio_postgres::SimpleQueryMessage::CommandComplete(n) => *n,
                    _ => 0,
                })
                .sum();
            return Ok(RowsAffected { rows_affected });
        }
        let statement = self.prepare_statement(sql).await?;
        self.execute_statement(&statement, args).await
    }

    async fn batch(&mut self, sql: &str) -> Result<()> {
        self.client.batch_execute(sql).await.map_err(|e| {
            log_error(e, || {
                format!("While executing the batch:\n{}", truncate_long!(sql))
            })
        })
    }

    async fn prepare(&mut self, sql: &str) -> Result<Statement> {
        let sql = sql.trim_end().trim_end_matches(';');
        self.prepare_statement(sql).await
    }

    async fn query_prepared(&mut self, prepared: &Statement, args: Vec<Value>) -> Result<RowSet> {
        self.query_statement(prepared, args).await
    }

    async fn execute_prepared(
        &mut self,
        prepared: &Statement,
        args: Vec<Value>,
    ) -> Result<RowsAffected> {
        self.execute_statement(prepared, args).await
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}
