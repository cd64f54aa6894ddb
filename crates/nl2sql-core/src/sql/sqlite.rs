use super::executor::{Database, SqlExecutor};
use crate::config::MEMORY_DATABASE;
use crate::model::{Cell, DatabaseConfig, Row};
use anyhow::Context;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Number of VM instructions between two deadline checks.
const PROGRESS_OPS: i32 = 1_000;

#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    path: String,
    setup_sql: Option<String>,
    statement_timeout: Option<Duration>,
}

impl SqliteDatabase {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            setup_sql: None,
            statement_timeout: None,
        }
    }

    pub fn memory() -> Self {
        Self::new(MEMORY_DATABASE)
    }

    pub fn with_setup_sql(mut self, sql: impl Into<String>) -> Self {
        self.setup_sql = Some(sql.into());
        self
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    pub fn from_config(cfg: &DatabaseConfig) -> anyhow::Result<Self> {
        let mut db = Self::new(cfg.path.clone());
        if let Some(script) = &cfg.setup_script {
            let sql = std::fs::read_to_string(script)
                .with_context(|| format!("failed to read database setup script {}", script))?;
            db = db.with_setup_sql(sql);
        }
        if let Some(ms) = cfg.statement_timeout_ms {
            db = db.with_statement_timeout(Duration::from_millis(ms));
        }
        Ok(db)
    }

    fn open(&self) -> anyhow::Result<Connection> {
        if self.path == MEMORY_DATABASE {
            return Connection::open_in_memory().context("failed to open in-memory sqlite db");
        }
        // An empty database created by accident would turn every pair into an
        // execution failure.
        if self.setup_sql.is_none() && !Path::new(&self.path).exists() {
            anyhow::bail!("database file does not exist: {}", self.path);
        }
        Connection::open(&self.path)
            .with_context(|| format!("failed to open sqlite db {}", self.path))
    }
}

impl Database for SqliteDatabase {
    fn connect(&self) -> anyhow::Result<Box<dyn SqlExecutor>> {
        let conn = self.open()?;
        if let Some(sql) = &self.setup_sql {
            conn.execute_batch(sql)
                .context("database setup script failed")?;
        }
        tracing::debug!(event = "nl2sql.db.connected", target = %self.path);
        Ok(Box::new(SqliteExecutor {
            conn,
            statement_timeout: self.statement_timeout,
        }))
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

pub struct SqliteExecutor {
    conn: Connection,
    statement_timeout: Option<Duration>,
}

impl SqliteExecutor {
    fn fetch_all(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns = stmt.column_count();
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(columns);
            for i in 0..columns {
                cells.push(cell_from(row.get_ref(i)?));
            }
            out.push(cells);
        }
        Ok(out)
    }
}

impl SqlExecutor for SqliteExecutor {
    fn query(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        if let Some(limit) = self.statement_timeout {
            let deadline = Instant::now() + limit;
            self.conn
                .progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));
        }

        let result = self.fetch_all(sql);

        if self.statement_timeout.is_some() {
            self.conn.progress_handler(0, None::<fn() -> bool>);
        }

        match (result, self.statement_timeout) {
            (Err(e), Some(limit)) if is_interrupt(&e) => Err(anyhow::anyhow!(
                "statement interrupted after {} ms",
                limit.as_millis()
            )),
            (r, _) => r,
        }
    }
}

fn is_interrupt(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(f, _)) if f.code == rusqlite::ErrorCode::OperationInterrupted
    )
}

fn cell_from(v: ValueRef<'_>) -> Cell {
    match v {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(i) => Cell::Integer(i),
        ValueRef::Real(f) => Cell::Real(f),
        ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Cell::Blob(b.to_vec()),
    }
}
