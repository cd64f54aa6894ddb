use super::llm::LlmClient;
use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Produces one candidate SQL statement for a question.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(&self, question: &str) -> anyhow::Result<String>;
    fn provider_name(&self) -> &'static str;
}

/// The fixed schema description sent with every question of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContext {
    pub name: String,
    pub ddl: String,
}

impl SchemaContext {
    pub fn new(name: impl Into<String>, ddl: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ddl: ddl.into(),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let ddl = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read schema context {}", path.display()))?;
        if ddl.trim().is_empty() {
            anyhow::bail!("schema context {} is empty", path.display());
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "schema".into());
        Ok(Self::new(name, ddl))
    }
}

/// Generator backed by a language model: schema context + question in, SQL out.
pub struct PromptGenerator {
    client: Arc<dyn LlmClient>,
    schema: SchemaContext,
    dialect: String,
}

impl PromptGenerator {
    pub fn new(client: Arc<dyn LlmClient>, schema: SchemaContext, dialect: impl Into<String>) -> Self {
        Self {
            client,
            schema,
            dialect: dialect.into(),
        }
    }

    pub fn build_prompt(&self, question: &str) -> String {
        format!(
            "{}\n\n-- Using valid {}, answer the question below with exactly one SQL query and nothing else.\n-- Question: {}\n",
            self.schema.ddl.trim_end(),
            self.dialect,
            question.trim()
        )
    }
}

#[async_trait]
impl SqlGenerator for PromptGenerator {
    async fn generate(&self, question: &str) -> anyhow::Result<String> {
        let prompt = self.build_prompt(question);
        let resp = self.client.complete(&prompt).await?;
        tracing::debug!(
            event = "nl2sql.generate.completed",
            provider = %resp.provider,
            model = %resp.model,
            schema = %self.schema.name,
            finish_reason = resp
                .meta
                .get("finish_reason")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
        );
        Ok(extract_sql(&resp.text))
    }

    fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\s*```$").expect("static regex")
    })
}

/// Trim the model's answer and unwrap a markdown code fence around it.
pub fn extract_sql(text: &str) -> String {
    let trimmed = text.trim();
    match fence_re().captures(trimmed) {
        Some(c) => c.get(1).map_or("", |m| m.as_str()).trim().to_string(),
        None => trimmed.to_string(),
    }
}
