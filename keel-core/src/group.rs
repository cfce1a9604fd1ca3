use crate::{
    DB, Driver, Executor, Registry, Result, RowSet, RowsAffected, Stmt, Tx, TxOptions, Value,
};
use log::Level;
use rand::Rng;
use serde::Deserialize;
use std::{future::Future, sync::Arc, time::Duration};

/// Construction options of a [`Group`], usually read from the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroupOptions {
    /// Urls of the read-only replicas.
    pub readonly_urls: Vec<String>,
    pub max_open_conns: Option<usize>,
    pub max_idle_conns: Option<usize>,
    /// Seconds.
    pub conn_max_lifetime: Option<u64>,
    /// Seconds.
    pub conn_max_idle_time: Option<u64>,
    /// Seconds to wait for a free connection.
    pub acquire_timeout: Option<u64>,
    /// Level used to log statements, unset disables statement logging.
    pub log_level: Option<Level>,
}

impl GroupOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
    pub fn lifetime(&self) -> Option<Duration> {
        self.conn_max_lifetime.map(Duration::from_secs)
    }
    pub fn idle_time(&self) -> Option<Duration> {
        self.conn_max_idle_time.map(Duration::from_secs)
    }
    pub fn timeout(&self) -> Option<Duration> {
        self.acquire_timeout.map(Duration::from_secs)
    }
}

/// Executor bound to a scope: a database or a transaction.
pub enum Handle<D: Driver> {
    Db(DB<D>),
    Tx(Tx<D>),
}

impl<D: Driver> Clone for Handle<D> {
    fn clone(&self) -> Self {
        match self {
            Handle::Db(v) => Handle::Db(v.clone()),
            Handle::Tx(v) => Handle::Tx(v.clone()),
        }
    }
}

impl<D: Driver> Handle<D> {
    pub fn as_tx(&self) -> Option<&Tx<D>> {
        match self {
            Handle::Tx(v) => Some(v),
            Handle::Db(..) => None,
        }
    }
}

impl<D: Driver> Executor for Handle<D> {
    type Driver = D;

    fn driver(&self) -> &D {
        match self {
            Handle::Db(v) => v.driver(),
            Handle::Tx(v) => v.driver(),
        }
    }

    fn registry(&self) -> &Arc<Registry> {
        match self {
            Handle::Db(v) => v.registry(),
            Handle::Tx(v) => v.registry(),
        }
    }

    fn log_level(&self) -> Option<Level> {
        match self {
            Handle::Db(v) => v.log_level(),
            Handle::Tx(v) => v.log_level(),
        }
    }

    fn fetch_raw(&self, sql: &str, args: Vec<Value>) -> impl Future<Output = Result<RowSet>> + Send {
        async move {
            match self {
                Handle::Db(v) => v.fetch_raw(sql, args).await,
                Handle::Tx(v) => v.fetch_raw(sql, args).await,
            }
        }
    }

    fn execute_raw(
        &self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            match self {
                Handle::Db(v) => v.execute_raw(sql, args).await,
                Handle::Tx(v) => v.execute_raw(sql, args).await,
            }
        }
    }

    fn prepare(&self, query: &str) -> impl Future<Output = Result<Stmt<D>>> + Send {
        async move {
            match self {
                Handle::Db(v) => v.prepare(query).await,
                Handle::Tx(v) => v.prepare(query).await,
            }
        }
    }

    fn begin_tx(&self, options: TxOptions) -> impl Future<Output = Result<Tx<D>>> + Send {
        async move {
            match self {
                Handle::Db(v) => v.begin_tx(options).await,
                Handle::Tx(v) => v.begin_tx(options).await,
            }
        }
    }
}

/// Per request state: the executor picked so far and whether replicas are excluded.
pub struct Scope<D: Driver> {
    handle: Option<Handle<D>>,
    writable_only: bool,
}

impl<D: Driver> Default for Scope<D> {
    fn default() -> Self {
        Self {
            handle: None,
            writable_only: false,
        }
    }
}

impl<D: Driver> Clone for Scope<D> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            writable_only: self.writable_only,
        }
    }
}

impl<D: Driver> Scope<D> {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn handle(&self) -> Option<&Handle<D>> {
        self.handle.as_ref()
    }
    pub fn tx(&self) -> Option<&Tx<D>> {
        self.handle.as_ref().and_then(Handle::as_tx)
    }
    pub fn is_writable_only(&self) -> bool {
        self.writable_only
    }
}

type Pick = Box<dyn Fn() -> usize + Send + Sync>;

/// One writable database and any number of read-only replicas sharing the same registry.
pub struct Group<D: Driver> {
    w: DB<D>,
    replicas: Vec<DB<D>>,
    pick: Option<Pick>,
    registry: Arc<Registry>,
}

impl<D: Driver> Group<D> {
    pub fn open(driver: D, url: &str, options: &GroupOptions) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let w = DB::open_with(driver.clone(), url, options, registry.clone(), false)?;
        let replicas = options
            .readonly_urls
            .iter()
            .map(|v| DB::open_with(driver.clone(), v, options, registry.clone(), true))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            w,
            replicas,
            pick: None,
            registry,
        })
    }

    /// Replace the uniform random replica choice, the result is taken modulo the replica count.
    pub fn set_pick(&mut self, pick: impl Fn() -> usize + Send + Sync + 'static) {
        self.pick = Some(Box::new(pick));
    }

    /// The writable database.
    pub fn db(&self) -> &DB<D> {
        &self.w
    }

    /// A replica, or the writable database when there are none.
    pub fn readonly_db(&self) -> &DB<D> {
        let len = self.replicas.len();
        if len == 0 {
            return &self.w;
        }
        let i = match &self.pick {
            Some(pick) => pick() % len,
            None => rand::thread_rng().gen_range(0..len),
        };
        &self.replicas[i]
    }

    pub fn readonly_dbs(&self) -> &[DB<D>] {
        &self.replicas
    }

    /// Same scope, replicas excluded from now on.
    pub fn writable_only(&self, scope: &Scope<D>) -> Scope<D> {
        Scope {
            handle: scope.handle.clone(),
            writable_only: true,
        }
    }

    /// The executor bound to `scope`, or a newly picked one together with the scope carrying it.
    pub fn pick_executor(&self, scope: &Scope<D>) -> (Scope<D>, Handle<D>) {
        if let Some(handle) = &scope.handle {
            return (scope.clone(), handle.clone());
        }
        let db = if scope.writable_only {
            &self.w
        } else {
            self.readonly_db()
        };
        let handle = Handle::Db(db.clone());
        (
            Scope {
                handle: Some(handle.clone()),
                writable_only: scope.writable_only,
            },
            handle,
        )
    }

    /// Begin a transaction: nested when `scope` carries one, on a replica when read-only and
    /// replicas are allowed, on the writable database otherwise.
    pub async fn begin(&self, scope: &Scope<D>, options: TxOptions) -> Result<(Scope<D>, Tx<D>)> {
        let tx = match scope.tx() {
            Some(tx) => tx.begin_tx(options).await?,
            None => {
                let db = if options.read_only && !options.writable_only && !scope.writable_only {
                    self.readonly_db()
                } else {
                    &self.w
                };
                db.begin_tx(options).await?
            }
        };
        Ok((
            Scope {
                handle: Some(Handle::Tx(tx.clone())),
                writable_only: scope.writable_only,
            },
            tx,
        ))
    }
}

impl<D: Driver> Executor for Group<D> {
    type Driver = D;

    fn driver(&self) -> &D {
        self.w.driver()
    }

    fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn log_level(&self) -> Option<Level> {
        self.w.log_level()
    }

    fn fetch_raw(&self, sql: &str, args: Vec<Value>) -> impl Future<Output = Result<RowSet>> + Send {
        self.w.fetch_raw(sql, args)
    }

    fn execute_raw(
        &self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.w.execute_raw(sql, args)
    }

    fn prepare(&self, query: &str) -> impl Future<Output = Result<Stmt<D>>> + Send {
        self.w.prepare(query)
    }

    fn begin_tx(&self, options: TxOptions) -> impl Future<Output = Result<Tx<D>>> + Send {
        self.w.begin_tx(options)
    }
}
