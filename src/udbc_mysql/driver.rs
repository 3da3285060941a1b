use crate::error::DbError;
use crate::udbc::DEFAULT_POOL_NAME;
use crate::udbc::connection::Connection;
use crate::udbc::driver::Driver;
use crate::udbc_mysql::connection::MysqlConnection;
use async_trait::async_trait;
use mysql_async::{Conn, Opts, OptsBuilder};
use std::sync::Arc;
use std::time::Duration;

/// Opens one dedicated MySQL connection per `connect` call.
pub struct MysqlDriver {
    url: String,
    name: String,
    wait_timeout: Option<usize>,
    conn_ttl: Option<Duration>,
    opts: Option<Opts>,
}

impl MysqlDriver {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_POOL_NAME.to_string(),
            url: url.into(),
            wait_timeout: None,
            conn_ttl: None,
            opts: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Server-side `wait_timeout` in seconds for every connection.
    pub fn wait_timeout(mut self, secs: usize) -> Self {
        self.wait_timeout = Some(secs);
        self
    }

    pub fn conn_ttl(mut self, ttl: Duration) -> Self {
        self.conn_ttl = Some(ttl);
        self
    }

    /// Parses the URL once; every later `connect` reuses the options.
    pub fn build(mut self) -> Result<Self, DbError> {
        let opts = Opts::from_url(&self.url)
            .map_err(|e| DbError::Connection(format!("invalid database URL: {}", e)))?;
        let mut builder = OptsBuilder::from_opts(opts);
        if let Some(secs) = self.wait_timeout {
            builder = builder.wait_timeout(Some(secs));
        }
        if let Some(ttl) = self.conn_ttl {
            builder = builder.conn_ttl(Some(ttl));
        }
        self.opts = Some(Opts::from(builder));
        Ok(self)
    }
}

#[async_trait]
impl Driver for MysqlDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<Arc<dyn Connection>, DbError> {
        let opts = self
            .opts
            .clone()
            .ok_or_else(|| DbError::Config("MysqlDriver::build was not called".to_string()))?;
        let conn = Conn::new(opts).await?;
        Ok(Arc::new(MysqlConnection::new(conn)))
    }
}
