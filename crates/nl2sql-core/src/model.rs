use crate::engine::score::CorpusScore;
use crate::on_error::TranslationFailurePolicy;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default, rename = "configVersion", alias = "version")]
    pub version: u32,
    pub dataset: DatasetConfig,
    /// Path to the schema-context resource sent with every question.
    pub schema_context: String,
    pub generator: GeneratorConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<TranslationConfig>,
    pub database: DatabaseConfig,
    #[serde(default, skip_serializing_if = "is_default_settings")]
    pub settings: Settings,
    #[serde(default)]
    pub outputs: Outputs,
}

impl EvalConfig {
    pub fn output_for(&self, pass: PassKind) -> &str {
        match pass {
            PassKind::Direct => &self.outputs.direct,
            PassKind::Translated => &self.outputs.translated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub path: String,
    #[serde(default = "default_question_column")]
    pub question_column: String,
    #[serde(default = "default_reference_column")]
    pub reference_column: String,
}

fn default_question_column() -> String {
    "Natural Language Queries - Vietnamese".into()
}

fn default_reference_column() -> String {
    "Expected SQL Queries".into()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorProvider {
    #[default]
    Openai,
    Replay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub provider: GeneratorProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_generator_key_env")]
    pub api_key_env: String,
    /// Generation-length budget passed to the model.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_dialect")]
    pub dialect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_file: Option<String>,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_generator_key_env() -> String {
    "OPENAI_API_KEY".into()
}

fn default_max_tokens() -> u32 {
    256
}

fn default_dialect() -> String {
    "SQLite".into()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranslationProvider {
    #[default]
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default)]
    pub provider: TranslationProvider,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    #[serde(default = "default_translation_key_env")]
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub on_failure: TranslationFailurePolicy,
}

fn default_target_language() -> String {
    "en".into()
}

fn default_translation_key_env() -> String {
    "GOOGLE_TRANSLATE_API_KEY".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file, or `:memory:`.
    pub path: String,
    /// Script executed on every freshly opened connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

fn is_default_settings(s: &Settings) -> bool {
    s == &Settings::default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default = "default_direct_output")]
    pub direct: String,
    #[serde(default = "default_translated_output")]
    pub translated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Default for Outputs {
    fn default() -> Self {
        Self {
            direct: default_direct_output(),
            translated: default_translated_output(),
            summary: None,
        }
    }
}

fn default_direct_output() -> String {
    "reports/direct.csv".into()
}

fn default_translated_output() -> String {
    "reports/translated.csv".into()
}

/// One benchmark row: a question and the SQL that answers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPair {
    /// Zero-based data row in the source file.
    pub index: usize,
    pub question: String,
    pub reference_sql: String,
}

/// Row of the audit report. Only created once a candidate was generated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationRecord {
    pub index: usize,
    /// The question actually sent to the generator (translated when applicable).
    pub question: String,
    pub generated_sql: String,
    pub reference_sql: String,
    pub exact_match: bool,
    pub result_match: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    TranslationFailed,
    GenerationFailed,
    EmptyGeneration,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::TranslationFailed => "translation_failed",
            SkipReason::GenerationFailed => "generation_failed",
            SkipReason::EmptyGeneration => "empty_generation",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedPair {
    pub index: usize,
    pub question: String,
    pub reason: SkipReason,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    Evaluated(EvaluationRecord),
    Skipped(SkippedPair),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Direct,
    Translated,
}

impl PassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassKind::Direct => "direct",
            PassKind::Translated => "translated",
        }
    }

    pub fn uses_translation(&self) -> bool {
        matches!(self, PassKind::Translated)
    }
}

#[derive(Debug, Clone)]
pub struct PassReport {
    pub pass: PassKind,
    pub score: CorpusScore,
    pub records: Vec<EvaluationRecord>,
    pub skipped: Vec<SkippedPair>,
    pub report_path: Option<PathBuf>,
    /// Set when the report file could not be written. The score stays valid.
    pub report_error: Option<String>,
    pub duration_ms: u64,
}

impl PassReport {
    pub fn skip_count(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }
}

/// A single value returned by the database.
///
/// Integers and reals compare numerically, so `1` and `1.0` are the same cell.
#[derive(Debug, Clone)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Cell {
    fn rank(&self) -> u8 {
        match self {
            Cell::Null => 0,
            Cell::Integer(_) | Cell::Real(_) => 1,
            Cell::Text(_) => 2,
            Cell::Blob(_) => 3,
        }
    }
}

fn cmp_real(a: f64, b: f64) -> Ordering {
    if a == b {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// Exact comparison; `i as f64` rounds once |i| exceeds 2^53.
fn cmp_int_real(i: i64, r: f64) -> Ordering {
    // i64 range is [-2^63, 2^63)
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if r.is_nan() {
        // same side total_cmp puts NaN on
        return if r.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if r >= BOUND {
        return Ordering::Less;
    }
    if r < -BOUND {
        return Ordering::Greater;
    }
    let whole = r.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => whole.partial_cmp(&r).unwrap_or(Ordering::Equal),
        o => o,
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cell::Null, Cell::Null) => Ordering::Equal,
            (Cell::Integer(a), Cell::Integer(b)) => a.cmp(b),
            (Cell::Real(a), Cell::Real(b)) => cmp_real(*a, *b),
            (Cell::Integer(a), Cell::Real(b)) => cmp_int_real(*a, *b),
            (Cell::Real(a), Cell::Integer(b)) => cmp_int_real(*b, *a).reverse(),
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            (Cell::Blob(a), Cell::Blob(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Integer(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Real(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

pub type Row = Vec<Cell>;

/// Rows returned by one statement, kept as a set: order and duplicate
/// multiplicity do not take part in equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    rows: BTreeSet<Row>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }
}

impl FromIterator<Row> for ResultSet {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Result of executing one statement. A failure is not an empty set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Rows(ResultSet),
    Failed(String),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Rows(_))
    }

    pub fn result_set(&self) -> Option<&ResultSet> {
        match self {
            ExecutionOutcome::Rows(rs) => Some(rs),
            ExecutionOutcome::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub meta: serde_json::Value,
}
