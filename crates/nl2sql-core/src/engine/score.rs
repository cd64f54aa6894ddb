use serde::{Deserialize, Serialize};

/// Corpus-level counters for one pass.
///
/// Only pairs that reached the comparison stage are recorded; skipped pairs
/// never touch `total_evaluated`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusScore {
    pub total_evaluated: u64,
    pub exact_match_count: u64,
    pub execution_match_count: u64,
}

impl CorpusScore {
    pub fn record(&mut self, exact_match: bool, result_match: bool) {
        self.total_evaluated += 1;
        if exact_match {
            self.exact_match_count += 1;
        }
        if result_match {
            self.execution_match_count += 1;
        }
    }

    /// EM, in percent.
    pub fn exact_match_rate(&self) -> f64 {
        percentage(self.exact_match_count, self.total_evaluated)
    }

    /// EX, in percent.
    pub fn execution_match_rate(&self) -> f64 {
        percentage(self.execution_match_count, self.total_evaluated)
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * count as f64 / total as f64
}
