use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SETUP: &str = "
CREATE TABLE Laptops (Laptop_ID INTEGER PRIMARY KEY, Laptop_name TEXT, Price REAL);
INSERT INTO Laptops VALUES (1, 'Aspire 5', 599.0), (2, 'ThinkPad X1', 1499.5), (3, 'MacBook Air', 999.0);
";

const DATASET: &str = "\
Natural Language Queries - Vietnamese,Expected SQL Queries
Có bao nhiêu laptop?,
Liệt kê tên laptop,SELECT Laptop_name FROM Laptops
Laptop rẻ nhất,SELECT Laptop_name FROM Laptops ORDER BY Price LIMIT 1
";

const ANSWERS: &str = r#"{"question": "Liệt kê tên laptop", "sql": "select Laptop_name FROM Laptops"}
{"question": "Laptop rẻ nhất", "sql": "SELECT Laptop_name FROM Laptops ORDER BY Price DESC LIMIT 1"}
"#;

/// Offline fixture: replay generator, in-memory database seeded by a script.
fn fixture(translation: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data/benchmark.csv"), DATASET).unwrap();
    fs::write(root.join("setup.sql"), SETUP).unwrap();
    fs::write(root.join("schema.sql"), "CREATE TABLE Laptops (Laptop_ID INTEGER, Laptop_name TEXT, Price REAL);").unwrap();
    fs::write(root.join("answers.jsonl"), ANSWERS).unwrap();

    let config = root.join("nl2sql.yaml");
    fs::write(
        &config,
        format!(
            r#"version: 1
dataset:
  path: data/benchmark.csv
schema_context: schema.sql
generator:
  provider: replay
  replay_file: answers.jsonl
{translation}database:
  path: ":memory:"
  setup_script: setup.sql
  statement_timeout_ms: 2000
outputs:
  direct: reports/direct.csv
  translated: reports/translated.csv
"#
        ),
    )
    .unwrap();
    (dir, config)
}

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("nl2sql-eval").unwrap();
    cmd.env("NL2SQL_LOG", "warn");
    cmd
}

fn data_rows(path: &Path) -> usize {
    let body = fs::read_to_string(path).unwrap();
    // header plus one line per record; the fixture SQL has no newlines
    body.lines().count() - 1
}

#[test]
fn test_direct_pass_prints_scores_and_writes_report() {
    let (dir, config) = fixture("");

    bin()
        .args(["run", "--pass", "direct", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stderr(contains("Direct questions: 2 evaluated, 0 skipped"))
        .stderr(contains("EX Score: 50.00%"))
        .stderr(contains("EM Score: 50.00%"));

    let report = dir.path().join("reports/direct.csv");
    assert!(report.exists());
    assert_eq!(data_rows(&report), 2);
    let body = fs::read_to_string(&report).unwrap();
    assert!(body.starts_with("Natural Language Query,Generated SQL,Expected SQL,SQL Match,Result Match"));
    assert!(body.contains("Liệt kê tên laptop,select Laptop_name FROM Laptops,SELECT Laptop_name FROM Laptops,x,x"));
    assert!(!dir.path().join("reports/translated.csv").exists());
}

#[test]
fn test_summary_json_is_written() {
    let (dir, config) = fixture("");
    let out = dir.path().join("out/summary.json");

    bin()
        .args(["run", "--pass", "direct", "--config"])
        .arg(&config)
        .arg("--summary-json")
        .arg(&out)
        .assert()
        .success();

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(v["passes"][0]["pass"], "direct");
    assert_eq!(v["passes"][0]["total_evaluated"], 2);
    assert_eq!(v["passes"][0]["exact_match_rate"], 50.0);
}

#[test]
fn test_translated_pass_without_section_is_config_error() {
    let (_dir, config) = fixture("");

    bin()
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(contains("fatal:"))
        .stderr(contains("translation"));
}

#[test]
fn test_missing_translation_key_is_config_error() {
    let (dir, config) = fixture(
        "translation:\n  provider: google\n  api_key_env: NL2SQL_TEST_MISSING_KEY\n",
    );

    bin()
        .args(["run", "--pass", "both", "--config"])
        .arg(&config)
        .env_remove("NL2SQL_TEST_MISSING_KEY")
        .assert()
        .code(2)
        .stderr(contains("NL2SQL_TEST_MISSING_KEY"));

    // nothing ran
    assert!(!dir.path().join("reports/direct.csv").exists());
}

#[test]
fn test_missing_dataset_is_fatal() {
    let (dir, config) = fixture("");
    fs::remove_file(dir.path().join("data/benchmark.csv")).unwrap();

    bin()
        .args(["run", "--pass", "direct", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(contains("dataset file does not exist"));
}

#[test]
fn test_strict_rejects_unknown_keys() {
    let (_dir, config) = fixture("");
    let mut body = fs::read_to_string(&config).unwrap();
    body.push_str("extra_knob: true\n");
    fs::write(&config, body).unwrap();

    bin()
        .args(["run", "--pass", "direct", "--strict", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(contains("extra_knob"));

    bin()
        .args(["run", "--pass", "direct", "--config"])
        .arg(&config)
        .assert()
        .success();
}

#[test]
fn test_version_prints_package_version() {
    bin()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_default_config_path_is_used() {
    let (dir, _config) = fixture("");

    bin()
        .current_dir(dir.path())
        .args(["run", "--pass", "direct"])
        .assert()
        .success()
        .stderr(contains("EM Score: 50.00%"));

    assert!(dir.path().join("reports/direct.csv").exists());
}

#[test]
fn test_init_in_subdirectory_places_schema_next_to_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("eval/nl2sql.yaml");

    bin()
        .args(["init", "--config"])
        .arg(&config)
        .assert()
        .success();

    assert!(config.exists());
    assert!(dir.path().join("eval/schema.sql").exists());
}
