use crate::{PostgresConnection, PostgresSqlWriter};
use keel_core::{Context, Driver, Error, Result};
use openssl::ssl::{SslConnector, SslFiletype, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use std::{env, future::Future, path::Path};
use tokio::spawn;
use tokio_postgres::{Client, NoTls, Socket, tls::{MakeTlsConnect, TlsConnect}};
use url::Url;
use urlencoding::decode;

#[derive(Default, Debug, Clone, Copy)]
pub struct PostgresDriver;

impl PostgresDriver {
    pub const fn new() -> Self {
        Self
    }
}

async fn connect_with<T>(url: &Url, tls: T) -> Result<Client>
where
    T: MakeTlsConnect<Socket> + Send,
    T::Stream: Send + 'static,
    T::TlsConnect: Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let (client, connection) = tokio_postgres::connect(url.as_str(), tls).await?;
    spawn(async move {
        if let Err(e) = connection.await
            && !e.is_closed()
        {
            log::error!("Postgres connection error: {:#}", e);
        }
    });
    Ok(client)
}

impl Driver for PostgresDriver {
    type Connection = PostgresConnection;
    type SqlWriter = PostgresSqlWriter;

    const NAME: &'static str = "postgres";

    fn sql_writer(&self) -> PostgresSqlWriter {
        PostgresSqlWriter
    }

    fn check_url(&self, url: &str) -> Result<()> {
        let url = decode(url).with_context(|| format!("While decoding the url `{}`", url))?;
        let prefix = format!("{}://", Self::NAME);
        if !url.starts_with(&prefix) {
            let error = Error::msg(format!(
                "Postgres connection url must start with `{}`",
                &prefix
            ))
            .context(format!("While trying to connect to `{}`", url));
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(())
    }

    fn connect(&self, url: &str) -> impl Future<Output = Result<PostgresConnection>> + Send {
        let url = url.to_string();
        async move {
            self.check_url(&url)?;
            let context = || format!("While trying to connect to `{}`", url);
            let decoded = decode(&url).with_context(context)?;
            let mut url = Url::parse(&decoded).with_context(context)?;
            let mut take_url_param = |key: &str, env_var: &str| {
                let mut value = None;
                let mut pairs: Vec<(String, String)> = url
                    .query_pairs()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect();
                if let Some(pos) = pairs.iter().position(|(k, _)| k == key) {
                    let (_, v) = pairs.remove(pos);
                    value = Some(v);
                }
                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                value.or_else(|| env::var(env_var).ok())
            };
            let sslmode = take_url_param("sslmode", "PGSSLMODE").unwrap_or("disable".into());
            let client = if sslmode == "disable" {
                connect_with(&url, NoTls).await
            } else {
                let mut builder = SslConnector::builder(SslMethod::tls())?;
                if let Some(path) = take_url_param("sslrootcert", "PGSSLROOTCERT")
                    .as_deref()
                    .map(Path::new)
                    && path.exists()
                {
                    builder.set_ca_file(path)?;
                }
                if let Some(path) = take_url_param("sslcert", "PGSSLCERT")
                    .as_deref()
                    .map(Path::new)
                    && path.exists()
                {
                    builder.set_certificate_chain_file(path)?;
                }
                if let Some(path) = take_url_param("sslkey", "PGSSLKEY")
                    .as_deref()
                    .map(Path::new)
                    && path.exists()
                {
                    builder.set_private_key_file(path, SslFiletype::PEM)?;
                }
                builder.set_verify(match &*sslmode {
                    "require" | "prefer" | "allow" => SslVerifyMode::NONE,
                    _ => SslVerifyMode::PEER,
                });
                connect_with(&url, MakeTlsConnector::new(builder.build())).await
            }
            .map_err(|e| {
                let e = e.context(context());
                log::error!("{:#}", e);
                e
            })?;
            Ok(PostgresConnection::new(client))
        }
    }
}
