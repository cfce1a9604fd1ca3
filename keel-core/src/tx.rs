use crate::{
    Connection, DB, DataError, Driver, Executor, PooledConnection, Registry, Result, RowSet,
    RowsAffected, SqlWriter, Stmt, Value, log_at, scan_params,
};
use futures::FutureExt;
use log::Level;
use std::{
    fmt::{self, Debug, Display, Formatter},
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl Display for Isolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Isolation::ReadUncommitted => "READ UNCOMMITTED",
            Isolation::ReadCommitted => "READ COMMITTED",
            Isolation::RepeatableRead => "REPEATABLE READ",
            Isolation::Serializable => "SERIALIZABLE",
        })
    }
}

/// How a transaction is started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub read_only: bool,
    pub isolation: Option<Isolation>,
    /// Name of the savepoint of a nested transaction, generated when missing.
    pub savepoint: Option<String>,
    /// Never start on a read-only replica, even for a read-only transaction.
    pub writable_only: bool,
}

impl TxOptions {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }
    pub fn savepoint(mut self, name: impl Into<String>) -> Self {
        self.savepoint = Some(name.into());
        self
    }
    pub fn isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = Some(isolation);
        self
    }
    pub fn writable_only(mut self) -> Self {
        self.writable_only = true;
        self
    }
}

/// A transaction owning one pooled connection.
///
/// Nested transactions share the connection of their root and are delimited by savepoints:
/// begin is `SAVEPOINT <name>_BEGIN`, commit is `SAVEPOINT <name>`, rollback is
/// `ROLLBACK TO SAVEPOINT <name>_BEGIN`. Once the root is committed or rolled back its nested
/// transactions are finished too. A root transaction dropped while still open is rolled back in
/// the background.
pub struct Tx<D: Driver> {
    inner: Arc<TxInner<D>>,
}

struct TxInner<D: Driver> {
    db: DB<D>,
    connection: Arc<Mutex<PooledConnection<D>>>,
    savepoint: Option<String>,
    read_only: bool,
    canceled: AtomicBool,
    finished: AtomicBool,
    /// Shared by the whole family, set once the root is committed or rolled back.
    root_finished: Arc<AtomicBool>,
    savepoints: Arc<AtomicUsize>,
}

impl<D: Driver> Debug for Tx<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx")
            .field("savepoint", &self.savepoint())
            .field("read_only", &self.is_read_only())
            .field("canceled", &self.is_canceled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl<D: Driver> Clone for Tx<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Driver> Tx<D> {
    pub(crate) fn root(db: DB<D>, connection: PooledConnection<D>, read_only: bool) -> Self {
        Self {
            inner: Arc::new(TxInner {
                db,
                connection: Arc::new(Mutex::new(connection)),
                savepoint: None,
                read_only,
                canceled: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                root_finished: Arc::new(AtomicBool::new(false)),
                savepoints: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    pub fn db(&self) -> &DB<D> {
        &self.inner.db
    }

    /// Savepoint name of a nested transaction, `None` for the root.
    pub fn savepoint(&self) -> Option<&str> {
        self.inner.savepoint.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.read_only
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }

    /// Committed or rolled back, either this transaction or its root.
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
            || self.inner.root_finished.load(Ordering::Acquire)
    }

    /// Mark the transaction so that `commit` does nothing and `auto_commit` rolls back.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::Release);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_finished() {
            return Err(DataError::TxDone.into());
        }
        Ok(())
    }

    fn finish(&self) {
        self.inner.finished.store(true, Ordering::Release);
        if self.inner.savepoint.is_none() {
            self.inner.root_finished.store(true, Ordering::Release);
        }
    }

    async fn batch(&self, sql: &str) -> Result<()> {
        log_at!(self.log_level(), "{}", sql);
        let mut connection = self.inner.connection.lock().await;
        connection.batch(sql).await
    }

    pub async fn commit(&self) -> Result<()> {
        if self.is_canceled() {
            return Ok(());
        }
        self.ensure_open()?;
        let writer = self.driver().sql_writer();
        let mut sql = String::new();
        match &self.inner.savepoint {
            None => writer.write_transaction_commit(&mut sql),
            Some(name) => writer.write_savepoint(&mut sql, name),
        }
        self.batch(&sql).await?;
        self.finish();
        Ok(())
    }

    pub async fn rollback(&self) -> Result<()> {
        self.ensure_open()?;
        let writer = self.driver().sql_writer();
        let mut sql = String::new();
        match &self.inner.savepoint {
            None => writer.write_transaction_rollback(&mut sql),
            Some(name) => writer.write_rollback_to_savepoint(&mut sql, &format!("{}_BEGIN", name)),
        }
        self.batch(&sql).await?;
        self.finish();
        Ok(())
    }

    /// Roll back to an arbitrary savepoint, the transaction stays open.
    pub async fn rollback_to(&self, savepoint: &str) -> Result<()> {
        self.ensure_open()?;
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_rollback_to_savepoint(&mut sql, savepoint);
        self.batch(&sql).await
    }

    /// Prepare the query of `stmt` again, on the connection of this transaction.
    pub async fn stmt(&self, stmt: &Stmt<D>) -> Result<Stmt<D>> {
        self.ensure_open()?;
        let prepared = self
            .inner
            .connection
            .lock()
            .await
            .prepare(stmt.sql())
            .await?;
        log_at!(self.log_level(), "Statement rebound into a transaction: {}", stmt.sql());
        Ok(Stmt::new(
            stmt.sql().to_string(),
            stmt.keys().map(<[String]>::to_vec),
            self.inner.connection.clone(),
            prepared,
            self.registry().clone(),
            self.log_level(),
        ))
    }

    /// Run `f` inside this transaction, then commit on success and roll back otherwise.
    ///
    /// A canceled transaction is always rolled back. A panic inside `f` rolls back and then
    /// resumes unwinding.
    pub async fn auto_commit<F, Fut, T>(self, f: F) -> Result<T>
    where
        F: FnOnce(Tx<D>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let tx = self.clone();
        let outcome = AssertUnwindSafe(async move { f(tx).await })
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(value)) if !self.is_canceled() => match self.commit().await {
                Ok(()) => Ok(value),
                Err(e) => {
                    log::error!("{:#}", e);
                    self.rollback_quietly().await;
                    Err(e)
                }
            },
            Ok(Ok(value)) => {
                self.rollback().await?;
                Ok(value)
            }
            Ok(Err(e)) => {
                self.rollback_quietly().await;
                Err(e)
            }
            Err(payload) => {
                self.rollback_quietly().await;
                panic::resume_unwind(payload)
            }
        }
    }

    async fn rollback_quietly(&self) {
        if self.is_finished() {
            return;
        }
        if let Err(e) = self.rollback().await {
            log::error!("{:#}", e);
        }
    }
}

impl<D: Driver> Executor for Tx<D> {
    type Driver = D;

    fn driver(&self) -> &D {
        self.inner.db.driver()
    }

    fn registry(&self) -> &Arc<Registry> {
        self.inner.db.registry()
    }

    fn log_level(&self) -> Option<Level> {
        self.inner.db.log_level()
    }

    fn fetch_raw(&self, sql: &str, args: Vec<Value>) -> impl Future<Output = Result<RowSet>> + Send {
        async move {
            self.ensure_open()?;
            self.inner.connection.lock().await.query(sql, args).await
        }
    }

    fn execute_raw(
        &self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            self.ensure_open()?;
            self.inner.connection.lock().await.execute(sql, args).await
        }
    }

    fn prepare(&self, query: &str) -> impl Future<Output = Result<Stmt<D>>> + Send {
        async move {
            self.ensure_open()?;
            let (sql, keys) = {
                let writer = self.driver().sql_writer();
                let (sql, keys) = scan_params(query, writer.as_dyn());
                (sql.into_owned(), keys)
            };
            let prepared = self.inner.connection.lock().await.prepare(&sql).await?;
            log_at!(self.log_level(), "Statement prepared by a transaction: {}", sql);
            Ok(Stmt::new(
                sql,
                keys,
                self.inner.connection.clone(),
                prepared,
                self.registry().clone(),
                self.log_level(),
            ))
        }
    }

    fn begin_tx(&self, options: TxOptions) -> impl Future<Output = Result<Tx<D>>> + Send {
        async move {
            if self.inner.read_only {
                return Err(DataError::Readonly.into());
            }
            self.ensure_open()?;
            let name = options.savepoint.unwrap_or_else(|| {
                format!(
                    "keel_sp_{}",
                    self.inner.savepoints.fetch_add(1, Ordering::Relaxed)
                )
            });
            let mut sql = String::new();
            self.driver()
                .sql_writer()
                .write_savepoint(&mut sql, &format!("{}_BEGIN", name));
            self.batch(&sql).await?;
            Ok(Tx {
                inner: Arc::new(TxInner {
                    db: self.inner.db.clone(),
                    connection: self.inner.connection.clone(),
                    savepoint: Some(name),
                    read_only: options.read_only,
                    canceled: AtomicBool::new(false),
                    finished: AtomicBool::new(false),
                    root_finished: self.inner.root_finished.clone(),
                    savepoints: self.inner.savepoints.clone(),
                }),
            })
        }
    }
}

impl<D: Driver> Drop for TxInner<D> {
    fn drop(&mut self) {
        if self.savepoint.is_some() || *self.finished.get_mut() {
            return;
        }
        let mut sql = String::new();
        self.db.driver().sql_writer().write_transaction_rollback(&mut sql);
        let connection = self.connection.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = connection.lock().await.batch(&sql).await {
                        log::error!("{:#}", e);
                    }
                });
            }
            Err(..) => log::warn!(
                "A transaction was dropped outside of a tokio runtime without being committed or rolled back"
            ),
        }
    }
}
