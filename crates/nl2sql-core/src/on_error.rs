// on_error.rs - Translation failure policy for the translated pass.
//
// Decides what happens to a pair whose question could not be translated.

use serde::{Deserialize, Serialize};

/// What to do with a pair when the translation service fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationFailurePolicy {
    /// Drop the pair from the translated pass. It does not count towards
    /// `total_evaluated`.
    #[default]
    Skip,

    /// Evaluate the untranslated question instead.
    Fallback,
}

impl TranslationFailurePolicy {
    /// Apply the policy to a translation error for `question`.
    pub fn apply_to_error(&self, question: &str, error: &anyhow::Error) -> TranslationDecision {
        match self {
            TranslationFailurePolicy::Skip => TranslationDecision::Skip {
                reason: format!("translation failed: {:#}", error),
            },
            TranslationFailurePolicy::Fallback => TranslationDecision::Fallback {
                question: question.to_string(),
                warning: format!("translation failed, using original question: {:#}", error),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationDecision {
    Skip { reason: String },
    Fallback { question: String, warning: String },
}

impl TranslationDecision {
    pub fn is_skip(&self) -> bool {
        matches!(self, TranslationDecision::Skip { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            TranslationDecision::Skip { reason } => reason,
            TranslationDecision::Fallback { warning, .. } => warning,
        }
    }
}

/// Structured warning for a failed translation, naming the original question.
pub fn log_translation_failure(pair: usize, question: &str, decision: &TranslationDecision) {
    let action = if decision.is_skip() { "skipped" } else { "fallback" };
    tracing::warn!(
        event = "nl2sql.translate.failed",
        pair = pair,
        question = %question,
        action = action,
        "cannot translate question: {}", decision.message()
    );
}
