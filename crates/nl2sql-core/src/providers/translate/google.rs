use super::Translator;
use crate::errors::ConfigError;
use async_trait::async_trait;
use serde_json::json;

pub const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

/// Explicit settings for the Cloud Translation client.
#[derive(Debug, Clone)]
pub struct TranslatorSettings {
    pub api_key: String,
    pub endpoint: String,
    pub source_language: Option<String>,
}

impl TranslatorSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            source_language: None,
        }
    }
}

/// Cloud Translation (v2 REST) client.
pub struct GoogleTranslator {
    settings: TranslatorSettings,
    client: reqwest::Client,
}

impl GoogleTranslator {
    pub fn new(settings: TranslatorSettings) -> Result<Self, ConfigError> {
        if settings.api_key.trim().is_empty() {
            return Err("translation API key is missing".into());
        }
        if settings.endpoint.trim().is_empty() {
            return Err("translation endpoint must not be empty".into());
        }
        Ok(Self {
            settings,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String> {
        let mut body = json!({
            "q": text,
            "target": target_language,
            "format": "text",
        });
        if let Some(src) = &self.settings.source_language {
            body["source"] = json!(src);
        }

        let resp = self
            .client
            .post(&self.settings.endpoint)
            .query(&[("key", self.settings.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("translation API error ({}): {}", status, error_text);
        }

        let json: serde_json::Value = resp.json().await?;
        parse_translation(&json)
    }

    fn provider_name(&self) -> &'static str {
        "google"
    }
}

fn parse_translation(json: &serde_json::Value) -> anyhow::Result<String> {
    let text = json
        .pointer("/data/translations/0/translatedText")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("translation response missing translatedText"))?;
    if text.trim().is_empty() {
        anyhow::bail!("translation service returned empty text");
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_a_config_error() {
        let err = GoogleTranslator::new(TranslatorSettings::new("  ")).err().unwrap();
        assert!(err.0.contains("API key"));
        assert!(GoogleTranslator::new(TranslatorSettings::new("k")).is_ok());
    }

    #[test]
    fn parses_translated_text() {
        let body = json!({
            "data": { "translations": [
                { "translatedText": "How many laptops cost more than 1000?", "detectedSourceLanguage": "vi" }
            ]}
        });
        assert_eq!(
            parse_translation(&body).unwrap(),
            "How many laptops cost more than 1000?"
        );
    }

    #[test]
    fn empty_or_missing_text_is_an_error() {
        let empty = json!({ "data": { "translations": [ { "translatedText": "  " } ] } });
        assert!(parse_translation(&empty).is_err());
        let missing = json!({ "error": { "code": 403 } });
        assert!(parse_translation(&missing).is_err());
    }
}
