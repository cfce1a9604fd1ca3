use crate::{
    Connection, Decode, Driver, JoinedDist, Params, PooledConnection, Registry, Result, Rows,
    RowsAffected, log_at, truncate_long,
};
use log::Level;
use std::sync::Arc;
use tokio::sync::Mutex;

type Prepared<D> = <<D as Driver>::Connection as Connection>::Prepared;

/// A prepared statement bound to the connection that prepared it.
///
/// The named placeholders were rewritten at preparation time, `keys` lists them in slot order.
pub struct Stmt<D: Driver> {
    sql: Arc<str>,
    keys: Option<Arc<[String]>>,
    connection: Arc<Mutex<PooledConnection<D>>>,
    prepared: Arc<Prepared<D>>,
    registry: Arc<Registry>,
    log_level: Option<Level>,
}

impl<D: Driver> Clone for Stmt<D> {
    fn clone(&self) -> Self {
        Self {
            sql: self.sql.clone(),
            keys: self.keys.clone(),
            connection: self.connection.clone(),
            prepared: self.prepared.clone(),
            registry: self.registry.clone(),
            log_level: self.log_level,
        }
    }
}

impl<D: Driver> Stmt<D> {
    pub(crate) fn new(
        sql: String,
        keys: Option<Vec<String>>,
        connection: Arc<Mutex<PooledConnection<D>>>,
        prepared: Prepared<D>,
        registry: Arc<Registry>,
        log_level: Option<Level>,
    ) -> Self {
        Self {
            sql: sql.into(),
            keys: keys.map(Into::into),
            connection,
            prepared: Arc::new(prepared),
            registry,
            log_level,
        }
    }

    /// The rewritten query text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn keys(&self) -> Option<&[String]> {
        self.keys.as_deref()
    }

    pub async fn execute<P: Params + ?Sized>(&self, params: &P) -> Result<RowsAffected> {
        let args = params.param_values(self.keys(), &self.registry)?;
        log_at!(
            self.log_level,
            "Statement execute {} {:?}",
            truncate_long!(self.sql),
            args
        );
        self.connection
            .lock()
            .await
            .execute_prepared(&self.prepared, args)
            .await
    }

    pub async fn rows<P: Params + ?Sized>(&self, params: &P) -> Result<Rows> {
        let args = params.param_values(self.keys(), &self.registry)?;
        log_at!(
            self.log_level,
            "Statement query {} {:?}",
            truncate_long!(self.sql),
            args
        );
        let set = self
            .connection
            .lock()
            .await
            .query_prepared(&self.prepared, args)
            .await?;
        Ok(Rows::new(set, self.registry.clone()))
    }

    pub async fn fetch_one<T: Decode, P: Params + ?Sized>(&self, params: &P) -> Result<T> {
        self.rows(params).await?.fetch_one()
    }

    pub async fn fetch_many<T: Decode, P: Params + ?Sized>(
        &self,
        params: &P,
        out: &mut Vec<T>,
    ) -> Result<()> {
        self.rows(params).await?.fetch_many(out)
    }

    pub async fn fetch_one_joined<J: JoinedDist + ?Sized, P: Params + ?Sized>(
        &self,
        params: &P,
        dist: &mut J,
    ) -> Result<()> {
        self.rows(params).await?.fetch_one_joined(dist)
    }

    pub async fn fetch_many_joined<J: JoinedDist + Default, P: Params + ?Sized>(
        &self,
        params: &P,
        out: &mut Vec<J>,
    ) -> Result<()> {
        self.rows(params).await?.fetch_many_joined(out)
    }
}
