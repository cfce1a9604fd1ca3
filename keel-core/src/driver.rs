use crate::{Result, RowSet, RowsAffected, SqlWriter, Value};
use deadpool::managed::{self, Metrics, RecycleError, RecycleResult};
use std::{future::Future, sync::Arc, time::Duration};

/// Backend entry point: opens physical connections and provides the dialect printer.
pub trait Driver: Clone + Send + Sync + 'static {
    type Connection: Connection;
    type SqlWriter: SqlWriter;

    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;

    /// Establish a new physical connection.
    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Connection>> + Send;

    /// Reject a url this driver cannot handle, before any connection is attempted.
    fn check_url(&self, _url: &str) -> Result<()> {
        Ok(())
    }

    /// Pool manager creating connections to `url`.
    fn open(&self, url: &str) -> Result<Connector<Self>> {
        self.check_url(url)?;
        Ok(Connector::new(self.clone(), url))
    }
}

/// A single physical connection, statements are sent one at a time.
pub trait Connection: Send + Sync + 'static {
    type Prepared: Send + Sync + 'static;

    /// Run a query returning rows.
    fn query(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowSet>> + Send;

    /// Run a statement returning the number of affected rows.
    fn execute(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send;

    /// Run one or more statements without arguments.
    fn batch(&mut self, sql: &str) -> impl Future<Output = Result<()>> + Send;

    fn prepare(&mut self, sql: &str) -> impl Future<Output = Result<Self::Prepared>> + Send;

    fn query_prepared(
        &mut self,
        prepared: &Self::Prepared,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowSet>> + Send;

    fn execute_prepared(
        &mut self,
        prepared: &Self::Prepared,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send;

    /// The server side closed the connection, it will not be handed out again.
    fn is_closed(&self) -> bool;
}

/// Pool manager of the connections to one url.
#[derive(Debug, Clone)]
pub struct Connector<D: Driver> {
    driver: D,
    url: Arc<str>,
    max_lifetime: Option<Duration>,
    max_idle_time: Option<Duration>,
}

pub type Pool<D> = managed::Pool<Connector<D>>;
pub type PooledConnection<D> = managed::Object<Connector<D>>;

impl<D: Driver> Connector<D> {
    pub fn new(driver: D, url: &str) -> Self {
        Self {
            driver,
            url: url.into(),
            max_lifetime: None,
            max_idle_time: None,
        }
    }

    /// Connections older than `value` are closed instead of being reused.
    pub fn max_lifetime(mut self, value: Option<Duration>) -> Self {
        self.max_lifetime = value;
        self
    }

    /// Connections unused for longer than `value` are closed instead of being reused.
    pub fn max_idle_time(mut self, value: Option<Duration>) -> Self {
        self.max_idle_time = value;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: Driver> managed::Manager for Connector<D> {
    type Type = D::Connection;
    type Error = crate::Error;

    async fn create(&self) -> Result<Self::Type> {
        self.driver.connect(&self.url).await
    }

    async fn recycle(
        &self,
        connection: &mut Self::Type,
        metrics: &Metrics,
    ) -> RecycleResult<Self::Error> {
        if connection.is_closed() {
            return Err(RecycleError::Message("connection closed".into()));
        }
        if self.max_lifetime.is_some_and(|v| metrics.age() > v) {
            return Err(RecycleError::Message("connection lifetime exceeded".into()));
        }
        if self.max_idle_time.is_some_and(|v| metrics.last_used() > v) {
            return Err(RecycleError::Message("connection idle for too long".into()));
        }
        Ok(())
    }
}
