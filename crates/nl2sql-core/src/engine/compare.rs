use crate::model::{ExecutionOutcome, ResultSet};
use crate::sql::SqlExecutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionComparison {
    pub result_match: bool,
    pub generated: ExecutionOutcome,
    pub reference: ExecutionOutcome,
}

/// Run one statement, turning an executor error into `Failed`.
pub fn execute(executor: &dyn SqlExecutor, sql: &str) -> ExecutionOutcome {
    match executor.query(sql) {
        Ok(rows) => ExecutionOutcome::Rows(rows.into_iter().collect::<ResultSet>()),
        Err(e) => ExecutionOutcome::Failed(format!("{:#}", e)),
    }
}

/// Execute both statements and compare their result sets as sets.
///
/// Both statements are always attempted. The result matches only when both
/// ran successfully and returned the same set of rows.
pub fn compare(
    executor: &dyn SqlExecutor,
    generated_sql: &str,
    reference_sql: &str,
) -> ExecutionComparison {
    let generated = execute(executor, generated_sql);
    if let ExecutionOutcome::Failed(err) = &generated {
        tracing::warn!(
            event = "nl2sql.exec.failed",
            side = "generated",
            sql = %generated_sql,
            error = %err,
            "error executing generated SQL"
        );
    }

    let reference = execute(executor, reference_sql);
    if let ExecutionOutcome::Failed(err) = &reference {
        tracing::warn!(
            event = "nl2sql.exec.failed",
            side = "reference",
            sql = %reference_sql,
            error = %err,
            "error executing reference SQL"
        );
    }

    let result_match = match (&generated, &reference) {
        (ExecutionOutcome::Rows(g), ExecutionOutcome::Rows(r)) => g == r,
        _ => false,
    };

    ExecutionComparison {
        result_match,
        generated,
        reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cell;
    use crate::sql::sqlite::SqliteDatabase;
    use crate::sql::Database;

    fn executor() -> Box<dyn SqlExecutor> {
        SqliteDatabase::memory()
            .with_setup_sql(
                "CREATE TABLE t (id INTEGER, name TEXT);
                 INSERT INTO t VALUES (1, 'a'), (2, 'b'), (2, 'b');",
            )
            .connect()
            .unwrap()
    }

    #[test]
    fn order_and_duplicates_do_not_matter() {
        let ex = executor();
        let c = compare(
            ex.as_ref(),
            "SELECT id, name FROM t",
            "SELECT DISTINCT id, name FROM t ORDER BY id DESC",
        );
        assert!(c.result_match);
        assert_eq!(c.generated.result_set().unwrap().len(), 2);
    }

    #[test]
    fn different_rows_do_not_match() {
        let ex = executor();
        let c = compare(ex.as_ref(), "SELECT id FROM t WHERE id = 1", "SELECT id FROM t WHERE id = 2");
        assert!(!c.result_match);
        assert!(c.generated.is_success());
        assert!(c.reference.is_success());
    }

    #[test]
    fn generated_failure_still_runs_reference() {
        let ex = executor();
        let c = compare(ex.as_ref(), "SELECT nope FROM missing", "SELECT id FROM t");
        assert!(!c.result_match);
        assert!(matches!(c.generated, ExecutionOutcome::Failed(_)));
        let rows: Vec<_> = c.reference.result_set().unwrap().rows().cloned().collect();
        assert_eq!(rows, vec![vec![Cell::Integer(1)], vec![Cell::Integer(2)]]);
    }

    #[test]
    fn reference_failure_is_a_mismatch() {
        let ex = executor();
        let c = compare(ex.as_ref(), "SELECT id FROM t", "SELECT FROM WHERE");
        assert!(!c.result_match);
        assert!(c.generated.is_success());
        assert!(!c.reference.is_success());
    }

    #[test]
    fn two_failures_never_match() {
        let ex = executor();
        let c = compare(ex.as_ref(), "SELECT * FROM nope", "SELECT * FROM nope");
        assert!(!c.result_match);
    }

    #[test]
    fn two_empty_sets_match() {
        let ex = executor();
        let c = compare(
            ex.as_ref(),
            "SELECT id FROM t WHERE id > 10",
            "SELECT id FROM t WHERE name = 'z'",
        );
        assert!(c.result_match);
    }
}
