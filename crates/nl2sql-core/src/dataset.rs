//! Query pair source: reads (question, reference SQL) rows from a CSV export
//! of the benchmark sheet.

use crate::model::{DatasetConfig, QueryPair};
use anyhow::Context;
use std::io::Read;
use std::path::Path;

/// Load every complete pair from the configured dataset, in file order.
///
/// A missing file or column is fatal. Rows with a blank question or
/// reference are skipped and never counted.
pub fn load_pairs(cfg: &DatasetConfig) -> anyhow::Result<Vec<QueryPair>> {
    let path = Path::new(&cfg.path);
    if !path.exists() {
        anyhow::bail!("dataset file does not exist: {}", path.display());
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open dataset {}", path.display()))?;

    let pairs = read_pairs(file, &cfg.question_column, &cfg.reference_column)
        .with_context(|| format!("failed to load dataset {}", path.display()))?;

    tracing::info!(
        event = "nl2sql.dataset.loaded",
        path = %path.display(),
        pairs = pairs.len(),
        "loaded query pairs"
    );
    Ok(pairs)
}

pub fn read_pairs<R: Read>(
    reader: R,
    question_column: &str,
    reference_column: &str,
) -> anyhow::Result<Vec<QueryPair>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().context("failed to read header row")?.clone();
    let q_idx = column_index(&headers, question_column)?;
    let r_idx = column_index(&headers, reference_column)?;

    let mut pairs = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("failed to read data row {}", index + 1))?;

        let question = record.get(q_idx).map(str::trim).unwrap_or("");
        let reference = record.get(r_idx).map(str::trim).unwrap_or("");
        if question.is_empty() || reference.is_empty() {
            tracing::debug!(
                event = "nl2sql.dataset.row_skipped",
                row = index,
                missing_question = question.is_empty(),
                missing_reference = reference.is_empty(),
                "skipping incomplete row"
            );
            continue;
        }

        pairs.push(QueryPair {
            index,
            question: question.to_string(),
            reference_sql: reference.to_string(),
        });
    }
    Ok(pairs)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> anyhow::Result<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name.trim())
        .ok_or_else(|| {
            let available: Vec<&str> = headers.iter().collect();
            anyhow::anyhow!(
                "column '{}' not found in dataset (available: {:?})",
                name,
                available
            )
        })
}
