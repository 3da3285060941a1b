use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Row as MyRow};
use tokio::sync::Mutex;

use crate::error::DbError;
use crate::udbc::connection::Connection;
use crate::udbc::result::ExecResult;
use crate::udbc::value::{Row, Value};
use crate::udbc_mysql::value_codec::{from_mysql_value, to_mysql_value};

pub struct MysqlConnection {
    conn: Mutex<Option<Conn>>,
}

impl MysqlConnection {
    pub fn new(conn: Conn) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    fn map_row(row: MyRow) -> Row {
        let cols = row.columns_ref();
        (0..row.len())
            .map(|i| {
                let name = cols
                    .get(i)
                    .map(|c| c.name_str().to_string())
                    .unwrap_or_else(|| i.to_string());
                let value = row.as_ref(i).map_or(Value::Null, from_mysql_value);
                (name, value)
            })
            .collect()
    }

    fn params(args: &[Value]) -> mysql_async::Params {
        if args.is_empty() {
            mysql_async::Params::Empty
        } else {
            mysql_async::Params::Positional(args.iter().map(to_mysql_value).collect())
        }
    }
}

fn closed() -> DbError {
    DbError::Connection("connection already closed".into())
}

#[async_trait]
impl Connection for MysqlConnection {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, DbError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;
        let rows: Vec<MyRow> = conn.exec(sql, Self::params(args)).await?;
        Ok(rows.into_iter().map(Self::map_row).collect())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DbError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;
        conn.exec_drop(sql, Self::params(args)).await?;
        Ok(ExecResult::new(
            conn.affected_rows(),
            conn.last_insert_id().unwrap_or(0),
        ))
    }

    async fn close(&self) -> Result<(), DbError> {
        match self.conn.lock().await.take() {
            Some(conn) => Ok(conn.disconnect().await?),
            None => Ok(()),
        }
    }
}
