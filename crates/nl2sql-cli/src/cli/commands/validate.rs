use nl2sql_core::config::{load_config, MEMORY_DATABASE};
use nl2sql_core::dataset::load_pairs;
use nl2sql_core::model::{EvalConfig, GeneratorProvider};
use nl2sql_core::providers::generator::SchemaContext;
use nl2sql_core::providers::replay::ReplayGenerator;
use nl2sql_core::sql::sqlite::SqliteDatabase;
use nl2sql_core::sql::Database;
use std::path::Path;

use super::exit_codes;
use crate::cli::args::ValidateArgs;

pub async fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let cfg = match load_config(&args.config, args.strict) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✖ Validation failed");
            eprintln!("  config: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let (errors, warnings) = check(&cfg);

    if !errors.is_empty() {
        eprintln!(
            "✖ Validation failed ({} error{}, {} warning{})",
            errors.len(),
            if errors.len() != 1 { "s" } else { "" },
            warnings.len(),
            if warnings.len() != 1 { "s" } else { "" }
        );
    } else if !warnings.is_empty() {
        eprintln!(
            "⚠️  Validation passed with warnings ({} warning{})",
            warnings.len(),
            if warnings.len() != 1 { "s" } else { "" }
        );
    } else {
        eprintln!("✔ Validation OK");
    }

    for e in &errors {
        eprintln!("  error: {}", e);
    }
    for w in &warnings {
        eprintln!("  warn: {}", w);
    }

    if errors.is_empty() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::CONFIG_ERROR)
    }
}

/// Everything `run` would load, minus the service calls.
fn check(cfg: &EvalConfig) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match load_pairs(&cfg.dataset) {
        Ok(pairs) if pairs.is_empty() => {
            warnings.push("dataset has no complete question/SQL pairs".to_string())
        }
        Ok(pairs) => eprintln!("dataset: {} pairs", pairs.len()),
        Err(e) => errors.push(format!("{:#}", e)),
    }

    if let Err(e) = SchemaContext::load(Path::new(&cfg.schema_context)) {
        errors.push(format!("{:#}", e));
    }

    match cfg.generator.provider {
        GeneratorProvider::Openai => {
            if std::env::var(&cfg.generator.api_key_env).map_or(true, |v| v.trim().is_empty()) {
                warnings.push(format!(
                    "{} is not set; `run` will fail for the openai generator",
                    cfg.generator.api_key_env
                ));
            }
        }
        GeneratorProvider::Replay => {
            if let Some(path) = &cfg.generator.replay_file {
                match ReplayGenerator::from_path(Path::new(path)) {
                    Ok(g) => eprintln!("replay: {} recorded answers", g.len()),
                    Err(e) => errors.push(format!("{:#}", e)),
                }
            }
        }
    }

    match &cfg.translation {
        Some(t) => {
            if std::env::var(&t.api_key_env).map_or(true, |v| v.trim().is_empty()) {
                warnings.push(format!(
                    "{} is not set; the translated pass will fail",
                    t.api_key_env
                ));
            }
        }
        None => warnings.push("no translation section; only --pass direct can run".to_string()),
    }

    let db = SqliteDatabase::from_config(&cfg.database).and_then(|db| db.connect().map(|_| ()));
    if let Err(e) = db {
        errors.push(format!("{:#}", e));
    } else if cfg.database.path == MEMORY_DATABASE && cfg.database.setup_script.is_none() {
        warnings.push("in-memory database without setup_script has no tables".to_string());
    }

    (errors, warnings)
}
