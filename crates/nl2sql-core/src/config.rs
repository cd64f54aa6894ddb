use crate::errors::ConfigError;
use crate::model::{EvalConfig, GeneratorProvider};
use std::path::Path;

pub mod path_resolver;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_PATH: &str = "nl2sql.yaml";
pub const MEMORY_DATABASE: &str = ":memory:";

pub fn load_config(path: &Path, strict: bool) -> Result<EvalConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);

    // serde_ignored wrapper to capture unknown fields
    let mut cfg: EvalConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    // YAML anchors live under `_` / `x-` prefixed keys
    let meaningful_unknowns: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();

    if !meaningful_unknowns.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "Unknown fields detected in strict mode: {:?} (file: {})",
                meaningful_unknowns,
                path.display()
            )));
        }
        tracing::warn!(
            event = "nl2sql.config.unknown_fields",
            fields = ?meaningful_unknowns,
            file = %path.display(),
            "ignored unknown config fields"
        );
    }

    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }

    validate(&cfg)?;
    normalize_paths(&mut cfg, path);

    Ok(cfg)
}

fn validate(cfg: &EvalConfig) -> Result<(), ConfigError> {
    if cfg.dataset.path.trim().is_empty() {
        return Err("dataset.path must not be empty".into());
    }
    if cfg.dataset.question_column == cfg.dataset.reference_column {
        return Err(ConfigError(format!(
            "dataset.question_column and dataset.reference_column are both '{}'",
            cfg.dataset.question_column
        )));
    }
    if cfg.schema_context.trim().is_empty() {
        return Err("schema_context must name a schema file".into());
    }
    if cfg.database.path.trim().is_empty() {
        return Err("database.path must not be empty (use ':memory:' for a scratch database)".into());
    }
    if cfg.generator.provider == GeneratorProvider::Replay
        && cfg
            .generator
            .replay_file
            .as_deref()
            .map_or(true, |f| f.trim().is_empty())
    {
        return Err("generator.provider 'replay' requires generator.replay_file".into());
    }
    if cfg.generator.max_tokens == 0 {
        return Err("generator.max_tokens must be greater than 0".into());
    }
    if let Some(t) = &cfg.translation {
        if t.target_language.trim().is_empty() {
            return Err("translation.target_language must not be empty".into());
        }
    }
    if cfg.settings.timeout_seconds == Some(0) {
        return Err("settings.timeout_seconds must be greater than 0".into());
    }
    Ok(())
}

fn normalize_paths(cfg: &mut EvalConfig, config_path: &Path) {
    let r = path_resolver::PathResolver::new(config_path);

    r.resolve_str(&mut cfg.dataset.path);
    r.resolve_str(&mut cfg.schema_context);
    r.resolve_opt_str(&mut cfg.generator.replay_file);
    if cfg.database.path != MEMORY_DATABASE {
        r.resolve_str(&mut cfg.database.path);
    }
    r.resolve_opt_str(&mut cfg.database.setup_script);
    r.resolve_str(&mut cfg.outputs.direct);
    r.resolve_str(&mut cfg.outputs.translated);
    r.resolve_opt_str(&mut cfg.outputs.summary);
}

pub const SAMPLE_SCHEMA: &str = r#"CREATE TABLE Laptops (
    Laptop_ID INTEGER PRIMARY KEY AUTOINCREMENT,
    Laptop_name VARCHAR(255) UNIQUE NOT NULL,
    Type VARCHAR(50),
    Price DECIMAL(10, 2),
    CPU VARCHAR(100),
    GPU VARCHAR(100),
    RAM VARCHAR(50),
    SSD VARCHAR(50),
    Description TEXT
);

CREATE TABLE Stores (
    Store_ID INTEGER PRIMARY KEY AUTOINCREMENT,
    Store_name VARCHAR(255) UNIQUE NOT NULL,
    Address VARCHAR(255),
    City VARCHAR(100),
    District VARCHAR(100)
);

CREATE TABLE Store_Laptop (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    Store_ID INT NOT NULL,
    Laptop_ID INT NOT NULL,
    Quantity INT DEFAULT 0,
    Discount_Percentage DECIMAL(5, 2),
    Last_Updated DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (Store_ID) REFERENCES Stores(Store_ID) ON DELETE CASCADE,
    FOREIGN KEY (Laptop_ID) REFERENCES Laptops(Laptop_ID) ON DELETE CASCADE
);
"#;

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"version: 1
dataset:
  path: data/benchmark.csv
  question_column: "Natural Language Queries - Vietnamese"
  reference_column: "Expected SQL Queries"
schema_context: schema.sql
generator:
  provider: openai
  model: gpt-4o-mini
  base_url: https://api.openai.com/v1
  api_key_env: OPENAI_API_KEY
  max_tokens: 256
  dialect: SQLite
translation:
  provider: google
  target_language: en
  api_key_env: GOOGLE_TRANSLATE_API_KEY
  on_failure: skip
database:
  path: products.db
  statement_timeout_ms: 10000
settings:
  timeout_seconds: 30
outputs:
  direct: reports/direct.csv
  translated: reports/translated.csv
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}

pub fn write_sample_schema(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, SAMPLE_SCHEMA)
        .map_err(|e| ConfigError(format!("failed to write sample schema: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::on_error::TranslationFailurePolicy;

    fn write(dir: &Path, body: &str) -> std::path::PathBuf {
        let p = dir.join("nl2sql.yaml");
        std::fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn sample_config_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nl2sql.yaml");
        write_sample_config(&p).unwrap();

        let cfg = load_config(&p, true).unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.generator.max_tokens, 256);
        assert_eq!(cfg.dataset.reference_column, "Expected SQL Queries");
        let t = cfg.translation.as_ref().unwrap();
        assert_eq!(t.target_language, "en");
        assert_eq!(t.on_failure, TranslationFailurePolicy::Skip);
        assert!(cfg.schema_context.ends_with("schema.sql"));
        assert!(std::path::Path::new(&cfg.dataset.path).starts_with(dir.path()));
    }

    #[test]
    fn memory_database_is_not_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(
            dir.path(),
            r#"
version: 1
dataset: { path: pairs.csv }
schema_context: schema.sql
generator: { provider: replay, replay_file: answers.jsonl }
database: { path: ":memory:" }
"#,
        );
        let cfg = load_config(&p, true).unwrap();
        assert_eq!(cfg.database.path, ":memory:");
        assert!(cfg.translation.is_none());
        assert!(cfg.generator.replay_file.unwrap().ends_with("answers.jsonl"));
    }

    #[test]
    fn strict_mode_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(
            dir.path(),
            r#"
version: 1
dataset: { path: pairs.csv }
schema_context: schema.sql
generator: { model: m }
database: { path: db.sqlite }
retries: 3
"#,
        );
        let err = load_config(&p, true).unwrap_err();
        assert!(err.0.contains("retries"), "{}", err);
        assert!(load_config(&p, false).is_ok());
    }

    #[test]
    fn replay_without_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(
            dir.path(),
            r#"
version: 1
dataset: { path: pairs.csv }
schema_context: schema.sql
generator: { provider: replay }
database: { path: db.sqlite }
"#,
        );
        let err = load_config(&p, false).unwrap_err();
        assert!(err.0.contains("replay_file"));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(
            dir.path(),
            r#"
version: 7
dataset: { path: pairs.csv }
schema_context: schema.sql
generator: {}
database: { path: db.sqlite }
"#,
        );
        let err = load_config(&p, false).unwrap_err();
        assert!(err.0.contains("unsupported config version 7"));
    }
}
