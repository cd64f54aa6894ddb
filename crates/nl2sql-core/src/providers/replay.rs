use super::generator::{extract_sql, SqlGenerator};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

/// Answers from SQL recorded in an earlier run, keyed by question.
///
/// One JSON object per line: `{"question": "...", "sql": "..."}`.
#[derive(Clone)]
pub struct ReplayGenerator {
    answers: Arc<HashMap<String, String>>,
}

#[derive(serde::Deserialize)]
struct ReplayEntry {
    question: String,
    #[serde(alias = "generated_sql")]
    sql: String,
}

impl ReplayGenerator {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("failed to open replay file {}: {}", path.display(), e))?;
        let reader = std::io::BufReader::new(file);

        let mut answers = HashMap::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: ReplayEntry = serde_json::from_str(&line)
                .map_err(|e| anyhow::anyhow!("line {}: failed to parse replay entry: {}", i + 1, e))?;

            let key = entry.question.trim().to_string();
            if answers.contains_key(&key) {
                return Err(anyhow::anyhow!(
                    "Duplicate question found in replay file at line {}: {}",
                    i + 1,
                    key
                ));
            }
            answers.insert(key, entry.sql);
        }

        Ok(Self {
            answers: Arc::new(answers),
        })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let answers = pairs
            .into_iter()
            .map(|(k, v)| (k.into().trim().to_string(), v.into()))
            .collect();
        Self {
            answers: Arc::new(answers),
        }
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[async_trait]
impl SqlGenerator for ReplayGenerator {
    async fn generate(&self, question: &str) -> anyhow::Result<String> {
        match self.answers.get(question.trim()) {
            Some(sql) => Ok(extract_sql(sql)),
            None => Err(anyhow::anyhow!("replay miss: question not found in replay file")),
        }
    }

    fn provider_name(&self) -> &'static str {
        "replay"
    }
}
