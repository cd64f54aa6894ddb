use clap::{Parser, Subcommand, ValueEnum};
use nl2sql_core::config::DEFAULT_CONFIG_PATH;
use nl2sql_core::model::PassKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "nl2sql-eval",
    version,
    about = "Score a text-to-SQL generator on a question/SQL benchmark (EM and EX)"
)]
pub struct Cli {
    /// Log filter, e.g. `info` or `nl2sql_core=debug`
    #[arg(long, global = true, env = "NL2SQL_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the evaluation passes and write the reports
    Run(RunArgs),
    /// Check config, dataset and schema without calling any service
    Validate(ValidateArgs),
    /// Write a sample config and schema file
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[arg(long, value_enum, default_value_t = PassArg::Both)]
    pub pass: PassArg,

    /// Also write a JSON summary of every pass (overrides outputs.summary)
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Reject unknown config keys instead of warning
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassArg {
    Direct,
    Translated,
    Both,
}

impl PassArg {
    pub fn kinds(self) -> Vec<PassKind> {
        match self {
            PassArg::Direct => vec![PassKind::Direct],
            PassArg::Translated => vec![PassKind::Translated],
            PassArg::Both => vec![PassKind::Direct, PassKind::Translated],
        }
    }
}
