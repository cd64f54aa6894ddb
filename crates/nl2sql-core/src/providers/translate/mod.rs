use async_trait::async_trait;

/// Machine translation of a question before generation.
///
/// One attempt per call; callers decide what a failure means for the pair.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String>;
    fn provider_name(&self) -> &'static str;
}

pub mod google;
