//! Blocking PostgreSQL connection over `tokio-postgres`.
//! A private current-thread runtime drives the client and its connection task;
//! each call blocks the caller until the server answers.

use tokio::runtime::Runtime;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, NoTls};
use tracing::{debug, warn};

use super::{Connection, DbError, Row};

pub struct PgConnection {
    rt: Runtime,
    client: Client,
}

fn to_db_error(err: tokio_postgres::Error) -> DbError {
    match err.as_db_error() {
        Some(db) => DbError::with_code(db.message(), db.code().code()),
        None => DbError { message: err.to_string(), code: err.code().map(|c| c.code().to_string()) },
    }
}

impl PgConnection {
    pub fn connect(url: &str) -> Result<Self, DbError> {
        let cfg: Config = url.parse().map_err(to_db_error)?;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::new(format!("cannot start database runtime: {}", e)))?;
        let (client, conn) = rt.block_on(cfg.connect(NoTls)).map_err(to_db_error)?;
        // polled whenever a call below is inside block_on
        rt.spawn(async move {
            if let Err(e) = conn.await { warn!(target: "dyntables::sql", "postgres connection closed: {}", e); }
        });
        debug!(target: "dyntables::sql", "connected to {:?}", cfg.get_dbname());
        Ok(Self { rt, client })
    }
}

fn bind(params: &[String]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

impl Connection for PgConnection {
    fn batch_execute(&mut self, sql: &str) -> Result<(), DbError> {
        debug!(target: "dyntables::sql", "{}", sql);
        self.rt.block_on(self.client.batch_execute(sql)).map_err(to_db_error)
    }

    fn execute(&mut self, sql: &str, params: &[String]) -> Result<u64, DbError> {
        debug!(target: "dyntables::sql", "{} {:?}", sql, params);
        let refs = bind(params);
        self.rt.block_on(self.client.execute(sql, &refs)).map_err(to_db_error)
    }

    fn query(&mut self, sql: &str, params: &[String]) -> Result<Vec<Row>, DbError> {
        debug!(target: "dyntables::sql", "{} {:?}", sql, params);
        let refs = bind(params);
        let rows = self.rt.block_on(self.client.query(sql, &refs)).map_err(to_db_error)?;
        let mut out: Vec<Row> = Vec::with_capacity(rows.len());
        for r in rows.iter() {
            let mut row: Row = Vec::with_capacity(r.len());
            for i in 0..r.len() {
                row.push(r.try_get::<_, Option<String>>(i).map_err(to_db_error)?);
            }
            out.push(row);
        }
        Ok(out)
    }
}
