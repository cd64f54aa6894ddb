use crate::model::{PassKind, PassReport, SkipReason};
use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub tool_version: String,
    pub generated_at: String,
    pub passes: Vec<PassSummary>,
}

#[derive(Debug, Serialize)]
pub struct PassSummary {
    pub pass: PassKind,
    pub total_evaluated: u64,
    pub exact_match_count: u64,
    pub execution_match_count: u64,
    pub exact_match_rate: f64,
    pub execution_match_rate: f64,
    pub skipped: BTreeMap<SkipReason, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_error: Option<String>,
    pub duration_ms: u64,
}

impl From<&PassReport> for PassSummary {
    fn from(r: &PassReport) -> Self {
        let mut skipped = BTreeMap::new();
        for s in &r.skipped {
            *skipped.entry(s.reason).or_insert(0) += 1;
        }
        Self {
            pass: r.pass,
            total_evaluated: r.score.total_evaluated,
            exact_match_count: r.score.exact_match_count,
            execution_match_count: r.score.execution_match_count,
            exact_match_rate: round2(r.score.exact_match_rate()),
            execution_match_rate: round2(r.score.execution_match_rate()),
            skipped,
            report_path: r.report_path.as_ref().map(|p| p.display().to_string()),
            report_error: r.report_error.clone(),
            duration_ms: r.duration_ms,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl RunSummary {
    pub fn new(reports: &[PassReport]) -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            passes: reports.iter().map(PassSummary::from).collect(),
        }
    }
}

pub fn write_summary_json(reports: &[PassReport], out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let summary = RunSummary::new(reports);
    let body = serde_json::to_string_pretty(&summary)?;
    std::fs::write(out, body).with_context(|| format!("failed to write {}", out.display()))?;
    Ok(())
}
