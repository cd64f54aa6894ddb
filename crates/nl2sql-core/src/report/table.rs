use crate::model::EvaluationRecord;
use anyhow::Context;
use std::path::Path;

pub const HEADERS: [&str; 5] = [
    "Natural Language Query",
    "Generated SQL",
    "Expected SQL",
    "SQL Match",
    "Result Match",
];

fn marker(hit: bool) -> &'static str {
    if hit {
        "x"
    } else {
        ""
    }
}

/// Write the row-level audit report, one row per evaluated pair.
pub fn write_report(records: &[EvaluationRecord], out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut w = csv::Writer::from_path(out)
        .with_context(|| format!("failed to create report {}", out.display()))?;
    w.write_record(HEADERS)?;
    for r in records {
        w.write_record([
            r.question.as_str(),
            r.generated_sql.as_str(),
            r.reference_sql.as_str(),
            marker(r.exact_match),
            marker(r.result_match),
        ])?;
    }
    w.flush()?;
    Ok(())
}
