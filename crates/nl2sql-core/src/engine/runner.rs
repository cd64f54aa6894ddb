use crate::engine::compare::compare;
use crate::engine::score::CorpusScore;
use crate::errors::ConfigError;
use crate::model::{
    EvaluationRecord, PairOutcome, PassKind, PassReport, QueryPair, SkipReason, SkippedPair,
};
use crate::on_error::{log_translation_failure, TranslationDecision, TranslationFailurePolicy};
use crate::providers::generator::SqlGenerator;
use crate::providers::translate::Translator;
use crate::report::table::write_report;
use crate::sql::{exact_match, Database, SqlExecutor};
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::Instrument;

#[derive(Debug, Clone)]
pub struct RunPolicy {
    pub translation_failure: TranslationFailurePolicy,
    pub target_language: String,
    /// Upper bound for one translation or generation call.
    pub call_timeout: Duration,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            translation_failure: TranslationFailurePolicy::Skip,
            target_language: "en".into(),
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of `Runner::run_suite`.
#[derive(Debug)]
pub struct SuiteRun {
    pub reports: Vec<PassReport>,
    /// Why the suite stopped early, if it did.
    pub failure: Option<anyhow::Error>,
}

/// Evaluates a corpus of query pairs against explicit collaborators.
pub struct Runner {
    pub generator: Arc<dyn SqlGenerator>,
    pub translator: Option<Arc<dyn Translator>>,
    pub database: Arc<dyn Database>,
    pub policy: RunPolicy,
}

impl Runner {
    /// Run each requested pass in order and write its report.
    ///
    /// A pass that cannot run stops the suite; reports of the passes that
    /// already finished are kept.
    pub async fn run_suite(
        &self,
        pairs: &[QueryPair],
        passes: &[(PassKind, Option<PathBuf>)],
    ) -> SuiteRun {
        let mut reports = Vec::with_capacity(passes.len());
        for (pass, out) in passes {
            match self.run_pass(*pass, pairs).await {
                Ok(mut report) => {
                    if let Some(out) = out {
                        self.save_report(&mut report, out.clone());
                    }
                    reports.push(report);
                }
                Err(e) => {
                    tracing::error!(
                        event = "nl2sql.pass.aborted",
                        pass = pass.as_str(),
                        completed = reports.len(),
                        error = %format!("{:#}", e)
                    );
                    return SuiteRun {
                        reports,
                        failure: Some(e),
                    };
                }
            }
        }
        SuiteRun {
            reports,
            failure: None,
        }
    }

    /// Evaluate every pair once. Per-pair failures never abort the pass; only
    /// an unusable configuration or database does.
    pub async fn run_pass(&self, pass: PassKind, pairs: &[QueryPair]) -> anyhow::Result<PassReport> {
        if pass.uses_translation() && self.translator.is_none() {
            return Err(ConfigError("translated pass requires a translation service".into()).into());
        }

        let start = std::time::Instant::now();
        tracing::info!(
            event = "nl2sql.pass.start",
            pass = pass.as_str(),
            pairs = pairs.len(),
            database = %self.database.describe()
        );

        // Owned by this pass; dropped (and closed) on every return path below.
        let executor = self
            .database
            .connect()
            .with_context(|| format!("failed to connect to {}", self.database.describe()))?;

        let mut score = CorpusScore::default();
        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for pair in pairs {
            let span = tracing::info_span!("pair", pass = pass.as_str(), index = pair.index);
            let outcome = self
                .evaluate_pair(pass, pair, executor.as_ref())
                .instrument(span)
                .await;
            match outcome {
                PairOutcome::Evaluated(rec) => {
                    score.record(rec.exact_match, rec.result_match);
                    records.push(rec);
                }
                PairOutcome::Skipped(s) => skipped.push(s),
            }
        }
        drop(executor);

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            event = "nl2sql.pass.end",
            pass = pass.as_str(),
            evaluated = score.total_evaluated,
            skipped = skipped.len(),
            em = score.exact_match_rate(),
            ex = score.execution_match_rate(),
            duration_ms
        );

        Ok(PassReport {
            pass,
            score,
            records,
            skipped,
            report_path: None,
            report_error: None,
            duration_ms,
        })
    }

    /// Persist the audit rows. A failure is recorded on the report and logged;
    /// the score is left untouched.
    pub fn save_report(&self, report: &mut PassReport, out: PathBuf) {
        match write_report(&report.records, &out) {
            Ok(()) => {
                tracing::info!(event = "nl2sql.report.saved", path = %out.display());
            }
            Err(e) => {
                tracing::error!(
                    event = "nl2sql.report.failed",
                    path = %out.display(),
                    error = %format!("{:#}", e),
                    "error saving report"
                );
                report.report_error = Some(format!("{:#}", e));
            }
        }
        report.report_path = Some(out);
    }

    async fn evaluate_pair(
        &self,
        pass: PassKind,
        pair: &QueryPair,
        executor: &dyn SqlExecutor,
    ) -> PairOutcome {
        let question = if pass.uses_translation() {
            match self.translate(&pair.question).await {
                Ok(q) => q,
                Err(e) => {
                    let decision = self.policy.translation_failure.apply_to_error(&pair.question, &e);
                    log_translation_failure(pair.index, &pair.question, &decision);
                    match decision {
                        TranslationDecision::Skip { reason } => {
                            return skip(pair, &pair.question, SkipReason::TranslationFailed, reason)
                        }
                        TranslationDecision::Fallback { question, .. } => question,
                    }
                }
            }
        } else {
            pair.question.clone()
        };

        let generated_sql = match self.generate(&question).await {
            Ok(sql) => sql.trim().to_string(),
            Err(e) => {
                tracing::warn!(
                    event = "nl2sql.generate.failed",
                    question = %question,
                    error = %format!("{:#}", e),
                    "error generating SQL"
                );
                return skip(pair, &question, SkipReason::GenerationFailed, format!("{:#}", e));
            }
        };
        if generated_sql.is_empty() {
            tracing::warn!(
                event = "nl2sql.generate.empty",
                question = %question,
                "generator returned no SQL"
            );
            return skip(
                pair,
                &question,
                SkipReason::EmptyGeneration,
                "generator returned empty output".into(),
            );
        }

        let is_exact = exact_match(&generated_sql, &pair.reference_sql);
        let comparison = compare(executor, &generated_sql, &pair.reference_sql);

        tracing::debug!(
            event = "nl2sql.pair.scored",
            exact_match = is_exact,
            result_match = comparison.result_match,
            generated_ok = comparison.generated.is_success(),
            reference_ok = comparison.reference.is_success()
        );

        PairOutcome::Evaluated(EvaluationRecord {
            index: pair.index,
            question,
            generated_sql,
            reference_sql: pair.reference_sql.clone(),
            exact_match: is_exact,
            result_match: comparison.result_match,
        })
    }

    async fn translate(&self, text: &str) -> anyhow::Result<String> {
        let translator = self
            .translator
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no translation service configured"))?;
        let t = self.policy.call_timeout;
        let fut = translator.translate(text, &self.policy.target_language);
        let translated = timeout(t, fut)
            .await
            .map_err(|_| anyhow::anyhow!("translation timed out after {}s", t.as_secs_f64()))??;
        if translated.trim().is_empty() {
            anyhow::bail!("translation returned empty text");
        }
        Ok(translated)
    }

    async fn generate(&self, question: &str) -> anyhow::Result<String> {
        let t = self.policy.call_timeout;
        timeout(t, self.generator.generate(question))
            .await
            .map_err(|_| anyhow::anyhow!("generation timed out after {}s", t.as_secs_f64()))?
    }
}

fn skip(pair: &QueryPair, question: &str, reason: SkipReason, message: String) -> PairOutcome {
    PairOutcome::Skipped(SkippedPair {
        index: pair.index,
        question: question.to_string(),
        reason,
        message,
    })
}
