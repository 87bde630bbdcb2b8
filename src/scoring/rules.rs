use crate::config::RiskConfig;
use crate::ingest::types::Transaction;

use super::types::RulesOutcome;

/// Case-insensitive substring match of `haystack` against any keyword.
pub fn contains_any(haystack: &str, keywords: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.is_empty())
        .any(|k| haystack.contains(&k.to_lowercase()))
}

/// Check if the beneficiary country matches a configured high-risk jurisdiction.
pub fn check_jurisdiction(tx: &Transaction, config: &RiskConfig) -> bool {
    contains_any(&tx.receiver_country, &config.high_risk_jurisdictions)
}

/// Check if the amount sits just below the mandatory reporting threshold.
pub fn check_structuring(tx: &Transaction, config: &RiskConfig) -> bool {
    let amount = tx.amount_f64();
    amount >= config.structuring.floor() && amount < config.structuring.reporting_threshold
}

/// Run the jurisdiction and structuring rules.
/// Jurisdiction risk takes precedence when both apply.
pub fn evaluate(tx: &Transaction, config: &RiskConfig) -> RulesOutcome {
    let is_high_risk_jurisdiction = check_jurisdiction(tx, config);
    let is_structuring = check_structuring(tx, config);

    let score = if is_high_risk_jurisdiction {
        config.jurisdiction_score_high
    } else if is_structuring {
        config.structuring.score.max(config.jurisdiction_score_low)
    } else {
        config.jurisdiction_score_low
    };

    RulesOutcome {
        score: score.min(100) as u8,
        is_high_risk_jurisdiction,
        is_structuring,
    }
}
