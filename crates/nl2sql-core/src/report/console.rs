use crate::model::{PassKind, PassReport, SkipReason};

fn pass_title(pass: PassKind) -> &'static str {
    match pass {
        PassKind::Direct => "Direct questions",
        PassKind::Translated => "Translated questions",
    }
}

pub fn pass_summary_lines(report: &PassReport) -> Vec<String> {
    let s = &report.score;
    let mut lines = vec![format!(
        "{}: {} evaluated, {} skipped ({} translation, {} generation, {} empty) in {:.1}s",
        pass_title(report.pass),
        s.total_evaluated,
        report.skipped.len(),
        report.skip_count(SkipReason::TranslationFailed),
        report.skip_count(SkipReason::GenerationFailed),
        report.skip_count(SkipReason::EmptyGeneration),
        report.duration_ms as f64 / 1000.0
    )];

    match (&report.report_path, &report.report_error) {
        (_, Some(err)) => lines.push(format!("Report not saved: {}", err)),
        (Some(p), None) => lines.push(format!("Report saved: {}", p.display())),
        (None, None) => {}
    }

    lines.push(format!("EX Score: {:.2}%", s.execution_match_rate()));
    lines.push(format!("EM Score: {:.2}%", s.exact_match_rate()));
    lines
}

pub fn print_pass_summary(report: &PassReport) {
    for line in pass_summary_lines(report) {
        eprintln!("{}", line);
    }
}

pub fn final_summary_lines(reports: &[PassReport]) -> Vec<String> {
    reports
        .iter()
        .map(|r| {
            format!(
                "{:<21} - EX: {:.2}%, EM: {:.2}% ({} evaluated)",
                pass_title(r.pass),
                r.score.execution_match_rate(),
                r.score.exact_match_rate(),
                r.score.total_evaluated
            )
        })
        .collect()
}

pub fn print_final_summary(reports: &[PassReport]) {
    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for line in final_summary_lines(reports) {
        eprintln!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::score::CorpusScore;
    use crate::model::SkippedPair;

    fn report(pass: PassKind, em: u64, ex: u64, total: u64) -> PassReport {
        PassReport {
            pass,
            score: CorpusScore {
                total_evaluated: total,
                exact_match_count: em,
                execution_match_count: ex,
            },
            records: vec![],
            skipped: vec![SkippedPair {
                index: 4,
                question: "q".into(),
                reason: SkipReason::TranslationFailed,
                message: "boom".into(),
            }],
            report_path: None,
            report_error: Some("permission denied".into()),
            duration_ms: 1500,
        }
    }

    #[test]
    fn pass_summary_has_two_decimal_scores() {
        let lines = pass_summary_lines(&report(PassKind::Translated, 1, 2, 3));
        assert!(lines[0].contains("3 evaluated, 1 skipped (1 translation"));
        assert!(lines.contains(&"Report not saved: permission denied".to_string()));
        assert!(lines.contains(&"EX Score: 66.67%".to_string()));
        assert!(lines.contains(&"EM Score: 33.33%".to_string()));
    }

    #[test]
    fn final_summary_compares_passes() {
        let lines = final_summary_lines(&[
            report(PassKind::Direct, 1, 1, 2),
            report(PassKind::Translated, 0, 0, 0),
        ]);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Direct questions"));
        assert!(lines[0].contains("EX: 50.00%, EM: 50.00%"));
        assert!(lines[1].contains("EX: 0.00%, EM: 0.00%"));
    }
}
