use crate::{
    Connection, Context, DataError, Driver, Error, Executor, GroupOptions, Pool, PooledConnection,
    Registry, Result, RowSet, RowsAffected, SqlWriter, Stmt, Tx, TxOptions, Value, log_at,
    scan_params, truncate_long,
};
use deadpool::managed::PoolError;
use log::Level;
use std::{cell::Cell, future::Future, sync::Arc};

/// Extensions created by [`DB::ensure_extensions`] when none is requested.
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["hstore", "uuid-ossp", "pgcrypto"];

/// A pool of connections to one database.
///
/// Cheap to clone. A read-only database refuses to begin writable transactions.
pub struct DB<D: Driver> {
    inner: Arc<DbInner<D>>,
}

struct DbInner<D: Driver> {
    driver: D,
    pool: Pool<D>,
    registry: Arc<Registry>,
    readonly: bool,
    log_level: Option<Level>,
    max_idle: Option<usize>,
}

impl<D: Driver> Clone for DB<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

fn pool_error(error: PoolError<Error>) -> Error {
    match error {
        PoolError::Backend(e) => e,
        e => Error::msg(e.to_string()),
    }
}

impl<D: Driver> DB<D> {
    /// Open a writable database with its own registry.
    pub fn open(driver: D, url: &str, options: &GroupOptions) -> Result<Self> {
        Self::open_with(driver, url, options, Arc::new(Registry::new()), false)
    }

    /// Connections are established lazily, only the url is validated here.
    pub fn open_with(
        driver: D,
        url: &str,
        options: &GroupOptions,
        registry: Arc<Registry>,
        readonly: bool,
    ) -> Result<Self> {
        let connector = driver
            .open(url)?
            .max_lifetime(options.lifetime())
            .max_idle_time(options.idle_time());
        let mut builder = Pool::builder(connector).runtime(deadpool::Runtime::Tokio1);
        if let Some(max_size) = options.max_open_conns {
            builder = builder.max_size(max_size);
        }
        if let Some(timeout) = options.timeout() {
            builder = builder
                .wait_timeout(Some(timeout))
                .create_timeout(Some(timeout));
        }
        let pool = builder
            .build()
            .with_context(|| format!("While building the {} connection pool", D::NAME))?;
        log_at!(
            options.log_level,
            "Opened a {} database{}",
            D::NAME,
            if readonly { " (readonly)" } else { "" }
        );
        Ok(Self {
            inner: Arc::new(DbInner {
                driver,
                pool,
                registry,
                readonly,
                log_level: options.log_level,
                max_idle: options.max_idle_conns,
            }),
        })
    }

    pub fn is_readonly(&self) -> bool {
        self.inner.readonly
    }

    pub fn pool(&self) -> &Pool<D> {
        &self.inner.pool
    }

    /// Take a connection out of the pool.
    pub async fn acquire(&self) -> Result<PooledConnection<D>> {
        self.inner.pool.get().await.map_err(pool_error)
    }

    /// Close idle connections above the configured maximum.
    fn release_idle(&self) {
        let Some(max_idle) = self.inner.max_idle else {
            return;
        };
        let available = self.inner.pool.status().available as usize;
        if available <= max_idle {
            return;
        }
        let excess = Cell::new(available - max_idle);
        let _ = self.inner.pool.retain(|_, _| {
            let n = excess.get();
            if n == 0 {
                return true;
            }
            excess.set(n - 1);
            false
        });
    }

    /// Create the given extensions, or [`DEFAULT_EXTENSIONS`] when `names` is empty.
    pub async fn ensure_extensions(&self, names: &[&str]) -> Result<()> {
        let names = if names.is_empty() {
            &DEFAULT_EXTENSIONS[..]
        } else {
            names
        };
        for name in names {
            let mut sql = String::new();
            self.driver()
                .sql_writer()
                .write_create_extension(&mut sql, name);
            self.execute_raw(&sql, Vec::new()).await?;
        }
        Ok(())
    }

    pub async fn enable_uuid(&self) -> Result<()> {
        self.ensure_extensions(&["uuid-ossp"]).await
    }

    pub async fn enable_hstore(&self) -> Result<()> {
        self.ensure_extensions(&["hstore"]).await
    }

    pub async fn enable_crypto(&self) -> Result<()> {
        self.ensure_extensions(&["pgcrypto"]).await
    }
}

impl<D: Driver> Executor for DB<D> {
    type Driver = D;

    fn driver(&self) -> &D {
        &self.inner.driver
    }

    fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    fn log_level(&self) -> Option<Level> {
        self.inner.log_level
    }

    fn fetch_raw(&self, sql: &str, args: Vec<Value>) -> impl Future<Output = Result<RowSet>> + Send {
        async move {
            let mut connection = self.acquire().await?;
            let result = connection.query(sql, args).await;
            drop(connection);
            self.release_idle();
            result
        }
    }

    fn execute_raw(
        &self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let mut connection = self.acquire().await?;
            let result = connection.execute(sql, args).await;
            drop(connection);
            self.release_idle();
            result
        }
    }

    /// The statement keeps its connection out of the pool for as long as it lives.
    fn prepare(&self, query: &str) -> impl Future<Output = Result<Stmt<D>>> + Send {
        async move {
            let (sql, keys) = {
                let writer = self.driver().sql_writer();
                let (sql, keys) = scan_params(query, writer.as_dyn());
                (sql.into_owned(), keys)
            };
            let mut connection = self.acquire().await?;
            let prepared = connection.prepare(&sql).await?;
            log_at!(self.log_level(), "Statement prepared: {}", truncate_long!(sql));
            Ok(Stmt::new(
                sql,
                keys,
                Arc::new(tokio::sync::Mutex::new(connection)),
                prepared,
                self.registry().clone(),
                self.log_level(),
            ))
        }
    }

    fn begin_tx(&self, options: TxOptions) -> impl Future<Output = Result<Tx<D>>> + Send {
        async move {
            if self.inner.readonly && !options.read_only {
                return Err(DataError::Readonly.into());
            }
            let mut sql = String::new();
            self.driver()
                .sql_writer()
                .write_transaction_begin(&mut sql, &options);
            let mut connection = self.acquire().await?;
            log_at!(self.log_level(), "{}", sql);
            connection.batch(&sql).await?;
            Ok(Tx::root(self.clone(), connection, options.read_only))
        }
    }
}
