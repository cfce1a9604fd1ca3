use crate::{
    Decode, Driver, JoinedDist, Params, Record, Registry, Result, RowSet, Rows, RowsAffected,
    SqlWriter, Stmt, Tx, TxOptions, Value, create_table_statements, drop_table_sql, scan_params,
};
use log::Level;
use std::{future::Future, sync::Arc};

/// The operation set shared by databases, transactions and group handles.
///
/// Implementors provide the raw primitives, the named-parameter and decoding layers come for free.
pub trait Executor: Send + Sync {
    type Driver: Driver;

    fn driver(&self) -> &Self::Driver;

    fn registry(&self) -> &Arc<Registry>;

    /// Level used to log statements, `None` disables it.
    fn log_level(&self) -> Option<Level>;

    /// Run an already rewritten query.
    fn fetch_raw(&self, sql: &str, args: Vec<Value>)
    -> impl Future<Output = Result<RowSet>> + Send;

    /// Run an already rewritten statement.
    fn execute_raw(
        &self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send;

    /// Prepare `query`, its named placeholders are bound at each execution.
    fn prepare(&self, query: &str) -> impl Future<Output = Result<Stmt<Self::Driver>>> + Send;

    /// Begin a transaction, nested through a savepoint when called on a transaction.
    fn begin_tx(
        &self,
        options: TxOptions,
    ) -> impl Future<Output = Result<Tx<Self::Driver>>> + Send;

    /// Rewrite the placeholders of `query` and collect the matching arguments from `params`.
    fn bind_params<P: Params + ?Sized>(
        &self,
        query: &str,
        params: &P,
    ) -> Result<(String, Vec<Value>)> {
        let writer = self.driver().sql_writer();
        let (sql, keys) = scan_params(query, writer.as_dyn());
        let args = params.param_values(keys.as_deref(), self.registry())?;
        crate::log_at!(
            self.log_level(),
            "{} {:?}",
            crate::truncate_long!(sql),
            args
        );
        Ok((sql.into_owned(), args))
    }

    fn execute<P: Params + ?Sized>(
        &self,
        query: &str,
        params: &P,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let (sql, args) = self.bind_params(query, params)?;
            self.execute_raw(&sql, args).await
        }
    }

    fn rows<P: Params + ?Sized>(
        &self,
        query: &str,
        params: &P,
    ) -> impl Future<Output = Result<Rows>> + Send {
        async move {
            let (sql, args) = self.bind_params(query, params)?;
            let set = self.fetch_raw(&sql, args).await?;
            Ok(Rows::new(set, self.registry().clone()))
        }
    }

    /// First row decoded as `T`, `NoRows` when there is none.
    fn fetch_one<T: Decode, P: Params + ?Sized>(
        &self,
        query: &str,
        params: &P,
    ) -> impl Future<Output = Result<T>> + Send {
        async move { self.rows(query, params).await?.fetch_one() }
    }

    /// Append every row to `out`, see [`Rows::fetch_many`].
    fn fetch_many<T: Decode, P: Params + ?Sized>(
        &self,
        query: &str,
        params: &P,
        out: &mut Vec<T>,
    ) -> impl Future<Output = Result<()>> + Send {
        async move { self.rows(query, params).await?.fetch_many(out) }
    }

    fn fetch_one_joined<D: JoinedDist + ?Sized, P: Params + ?Sized>(
        &self,
        query: &str,
        params: &P,
        dist: &mut D,
    ) -> impl Future<Output = Result<()>> + Send {
        async move { self.rows(query, params).await?.fetch_one_joined(dist) }
    }

    fn fetch_many_joined<D: JoinedDist + Default, P: Params + ?Sized>(
        &self,
        query: &str,
        params: &P,
        out: &mut Vec<D>,
    ) -> impl Future<Output = Result<()>> + Send {
        async move { self.rows(query, params).await?.fetch_many_joined(out) }
    }

    /// Create the table of `R` and its indexes if they do not exist.
    fn create_table<R: Record>(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            let statements = {
                let writer = self.driver().sql_writer();
                create_table_statements::<R>(writer.as_dyn(), self.registry())?
            };
            for statement in statements {
                self.execute_raw(&statement, Vec::new()).await?;
            }
            Ok(())
        }
    }

    fn drop_table<R: Record>(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            let sql = drop_table_sql::<R>(self.driver().sql_writer().as_dyn());
            self.execute_raw(&sql, Vec::new()).await?;
            Ok(())
        }
    }
}
