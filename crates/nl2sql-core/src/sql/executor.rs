use crate::model::Row;

/// Runs one SQL statement and returns every row it produced.
///
/// Statements are independent: no transaction spans two calls.
pub trait SqlExecutor: Send {
    fn query(&self, sql: &str) -> anyhow::Result<Vec<Row>>;
}

/// Opens executors. A pass connects once at its start and drops the executor
/// when it ends.
pub trait Database: Send + Sync {
    fn connect(&self) -> anyhow::Result<Box<dyn SqlExecutor>>;

    /// Human-readable target for log lines.
    fn describe(&self) -> String;
}
