use super::args::*;
use nl2sql_core::config::path_resolver::PathResolver;
use nl2sql_core::config::{load_config, write_sample_config, write_sample_schema};
use nl2sql_core::dataset::load_pairs;
use nl2sql_core::engine::runner::{RunPolicy, Runner};
use nl2sql_core::errors::ConfigError;
use nl2sql_core::model::{EvalConfig, GeneratorProvider, PassKind};
use nl2sql_core::providers::generator::{PromptGenerator, SchemaContext, SqlGenerator};
use nl2sql_core::providers::llm::openai::OpenAIClient;
use nl2sql_core::providers::replay::ReplayGenerator;
use nl2sql_core::providers::translate::google::{GoogleTranslator, TranslatorSettings};
use nl2sql_core::providers::translate::Translator;
use nl2sql_core::report::{console, summary};
use nl2sql_core::sql::sqlite::SqliteDatabase;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub mod validate;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const CONFIG_ERROR: i32 = 2;
}

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => cmd_run(args).await,
        Command::Validate(args) => validate::run(args).await,
        Command::Init(args) => cmd_init(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    if !args.config.exists() {
        if let Some(parent) = args.config.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_sample_config(&args.config)?;
        eprintln!("created {}", args.config.display());
    } else {
        eprintln!("note: {} already exists", args.config.display());
    }

    let schema = PathResolver::new(&args.config).base_dir().join("schema.sql");
    if !schema.exists() {
        write_sample_schema(&schema)?;
        eprintln!("created {}", schema.display());
    } else {
        eprintln!("note: {} already exists (skipped)", schema.display());
    }
    Ok(exit_codes::OK)
}

async fn cmd_run(args: RunArgs) -> anyhow::Result<i32> {
    let cfg = load_config(&args.config, args.strict)?;
    let passes = args.pass.kinds();

    let runner = build_runner(&cfg, &passes)?;
    let pairs = load_pairs(&cfg.dataset)?;
    if pairs.is_empty() {
        eprintln!("warning: dataset has no complete question/SQL pairs");
    }

    let plan: Vec<(PassKind, Option<PathBuf>)> = passes
        .iter()
        .map(|p| (*p, Some(PathBuf::from(cfg.output_for(*p)))))
        .collect();

    let run = runner.run_suite(&pairs, &plan).await;
    let reports = run.reports;

    for report in &reports {
        console::print_pass_summary(report);
    }
    console::print_final_summary(&reports);

    let summary_path = args
        .summary_json
        .clone()
        .or_else(|| cfg.outputs.summary.as_ref().map(PathBuf::from));
    if let Some(path) = summary_path {
        // same treatment as the CSV reports: the scores above stand
        match summary::write_summary_json(&reports, &path) {
            Ok(()) => eprintln!("Summary saved: {}", path.display()),
            Err(e) => tracing::error!(
                event = "nl2sql.summary.failed",
                path = %path.display(),
                error = %format!("{:#}", e),
                "error saving summary"
            ),
        }
    }

    match run.failure {
        Some(e) => Err(e),
        None => Ok(exit_codes::OK),
    }
}

/// Wire the collaborators for the requested passes. Every credential and
/// resource is checked here so no pass starts with a broken setup.
pub(crate) fn build_runner(cfg: &EvalConfig, passes: &[PassKind]) -> anyhow::Result<Runner> {
    let schema = SchemaContext::load(Path::new(&cfg.schema_context))?;

    let generator: Arc<dyn SqlGenerator> = match cfg.generator.provider {
        GeneratorProvider::Openai => {
            let key = read_credential(&cfg.generator.api_key_env, "generator.api_key_env")?;
            let client = OpenAIClient::new(
                cfg.generator.model.clone(),
                key,
                cfg.generator.base_url.clone(),
                cfg.generator.temperature,
                cfg.generator.max_tokens,
            );
            Arc::new(PromptGenerator::new(
                Arc::new(client),
                schema,
                cfg.generator.dialect.clone(),
            ))
        }
        GeneratorProvider::Replay => {
            let path = cfg
                .generator
                .replay_file
                .as_deref()
                .ok_or_else(|| ConfigError("generator.replay_file is required".into()))?;
            Arc::new(ReplayGenerator::from_path(Path::new(path))?)
        }
    };

    let needs_translation = passes.iter().any(|p| p.uses_translation());
    let mut policy = RunPolicy {
        call_timeout: Duration::from_secs(
            cfg.settings.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        ),
        ..RunPolicy::default()
    };

    let translator: Option<Arc<dyn Translator>> = if needs_translation {
        let t = cfg.translation.as_ref().ok_or_else(|| {
            ConfigError("translated pass requires a `translation` section (or use --pass direct)".into())
        })?;
        let mut settings = TranslatorSettings::new(read_credential(
            &t.api_key_env,
            "translation.api_key_env",
        )?);
        if let Some(endpoint) = &t.endpoint {
            settings.endpoint = endpoint.clone();
        }
        settings.source_language = t.source_language.clone();

        policy.translation_failure = t.on_failure;
        policy.target_language = t.target_language.clone();
        Some(Arc::new(GoogleTranslator::new(settings)?) as Arc<dyn Translator>)
    } else {
        None
    };

    let database = SqliteDatabase::from_config(&cfg.database)?;

    Ok(Runner {
        generator,
        translator,
        database: Arc::new(database),
        policy,
    })
}

fn read_credential(var: &str, setting: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError(format!(
            "environment variable {} is not set (named by {})",
            var, setting
        ))),
    }
}
