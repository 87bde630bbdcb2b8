use std::sync::Arc;

use crate::config::{RiskConfig, RoundNumberConfig};
use crate::history::store::AccountHistoryEntry;
use crate::ingest::types::Transaction;

use super::aggregate;
use super::models::{AnomalyModel, ContextModel, HeuristicAnomalyModel, HeuristicContextModel};
use super::rules::{self, contains_any};
use super::types::{RiskLevel, ScoreBreakdown, Signals};
use super::velocity;

/// Everything computed for one transaction before reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub signals: Signals,
    pub breakdown: ScoreBreakdown,
    pub total: u8,
    pub level: RiskLevel,
    pub is_high_risk: bool,
}

/// Runs the rules engine, velocity detector, score simulators and aggregator.
/// Holds no mutable state; history is supplied per call.
#[derive(Clone)]
pub struct ScoringEngine {
    config: Arc<RiskConfig>,
    anomaly_model: Arc<dyn AnomalyModel>,
    context_model: Arc<dyn ContextModel>,
}

impl ScoringEngine {
    /// Engine with the heuristic score simulators.
    pub fn new(config: Arc<RiskConfig>) -> Self {
        Self::with_models(
            config,
            Arc::new(HeuristicAnomalyModel),
            Arc::new(HeuristicContextModel),
        )
    }

    pub fn with_models(
        config: Arc<RiskConfig>,
        anomaly_model: Arc<dyn AnomalyModel>,
        context_model: Arc<dyn ContextModel>,
    ) -> Self {
        Self {
            config,
            anomaly_model,
            context_model,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Collect the boolean and numeric signals for `tx`.
    pub fn signals(
        &self,
        tx: &Transaction,
        history: &AccountHistoryEntry,
        count_override: Option<u32>,
    ) -> Signals {
        let config = self.config.as_ref();
        let amount = tx.amount_f64();
        Signals {
            rules: rules::evaluate(tx, config),
            velocity: velocity::detect(tx, history, config, count_override),
            is_high_value: amount > config.high_value_threshold,
            is_round_amount: check_round_amount(amount, &config.round_number),
            has_shell_keyword: contains_any(&tx.to_account, &config.shell_keywords),
            is_high_risk_channel: contains_any(&tx.transfer_type, &config.high_risk_channels),
        }
    }

    /// Score `tx` against a history snapshot. Pure: the same inputs give the same result.
    pub fn assess(
        &self,
        tx: &Transaction,
        history: &AccountHistoryEntry,
        count_override: Option<u32>,
    ) -> Assessment {
        let signals = self.signals(tx, history, count_override);

        let breakdown = ScoreBreakdown {
            rules: signals.rules.score,
            velocity: signals.velocity.score,
            anomaly: self.anomaly_model.score(&signals).min(100),
            contextual: self.context_model.score(&signals).min(100),
        };

        let total = aggregate::combine(&breakdown, &self.config.weights);
        let level = aggregate::classify(total, &self.config.levels);
        let is_high_risk = aggregate::is_high_risk(total, &self.config);

        tracing::debug!(
            transaction = %tx.id,
            total,
            level = level.as_str(),
            rules = breakdown.rules,
            velocity = breakdown.velocity,
            anomaly = breakdown.anomaly,
            contextual = breakdown.contextual,
            "Transaction scored"
        );

        Assessment {
            signals,
            breakdown,
            total,
            level,
            is_high_risk,
        }
    }
}

/// Check if the amount is a suspiciously round multiple of the configured unit.
pub fn check_round_amount(amount: f64, config: &RoundNumberConfig) -> bool {
    if amount < config.floor || config.unit <= 0.0 {
        return false;
    }
    let fraction = (amount % config.unit) / config.unit;
    fraction < config.tolerance || fraction > (1.0 - config.tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::TransactionStatus;
    use bigdecimal::BigDecimal;

    fn tx(amount: i64, country: &str, to: &str, channel: &str) -> Transaction {
        Transaction {
            id: "TX-1001".to_string(),
            amount: BigDecimal::from(amount),
            currency: "INR".to_string(),
            from_account: "ACC-8892-IN".to_string(),
            to_account: to.to_string(),
            receiver_country: country.to_string(),
            transfer_type: channel.to_string(),
            location: "Delhi Branch".to_string(),
            timestamp: None,
            status: TransactionStatus::Pending,
        }
    }

    struct FixedModel(u8);

    impl AnomalyModel for FixedModel {
        fn score(&self, _signals: &Signals) -> u8 {
            self.0
        }
    }

    impl ContextModel for FixedModel {
        fn score(&self, _signals: &Signals) -> u8 {
            self.0
        }
    }

    #[test]
    fn test_round_amount() {
        let config = RoundNumberConfig::default();
        assert!(check_round_amount(50_000.0, &config));
        assert!(check_round_amount(1_000_000.0, &config));
        assert!(check_round_amount(19_950.0, &config));
        assert!(!check_round_amount(9_000.0, &config));
        assert!(!check_round_amount(12_345.0, &config));
    }

    #[test]
    fn test_signals_from_transaction_fields() {
        let engine = ScoringEngine::new(Arc::new(RiskConfig::default()));
        let history = AccountHistoryEntry::default();
        let signals = engine.signals(
            &tx(1_500_000, "India", "ACC-77 (Blue Harbor Holdings)", "crypto"),
            &history,
            None,
        );
        assert!(signals.is_high_value);
        assert!(signals.is_round_amount);
        assert!(signals.has_shell_keyword);
        assert!(signals.is_high_risk_channel);
        assert!(!signals.rules.is_high_risk_jurisdiction);
    }

    #[test]
    fn test_high_value_is_strictly_greater() {
        let engine = ScoringEngine::new(Arc::new(RiskConfig::default()));
        let history = AccountHistoryEntry::default();
        let signals = engine.signals(&tx(1_000_000, "India", "B", "NEFT"), &history, None);
        assert!(!signals.is_high_value);
    }

    #[test]
    fn test_assess_routine_transaction() {
        let engine = ScoringEngine::new(Arc::new(RiskConfig::default()));
        let history = AccountHistoryEntry::default();
        let a = engine.assess(&tx(50_000, "India", "ACC-1123-IN", "NEFT"), &history, None);
        assert_eq!(a.breakdown.rules, 10);
        assert_eq!(a.breakdown.velocity, 10);
        assert_eq!(a.level, RiskLevel::Low);
        assert!(!a.is_high_risk);
    }

    #[test]
    fn test_assess_is_idempotent() {
        let engine = ScoringEngine::new(Arc::new(RiskConfig::default()));
        let history = AccountHistoryEntry::default();
        let t = tx(500_000, "Cayman", "ACC-9", "WIRE");
        assert_eq!(engine.assess(&t, &history, None), engine.assess(&t, &history, None));
    }

    #[test]
    fn test_models_are_substitutable() {
        let engine = ScoringEngine::with_models(
            Arc::new(RiskConfig::default()),
            Arc::new(FixedModel(100)),
            Arc::new(FixedModel(0)),
        );
        let history = AccountHistoryEntry::default();
        let a = engine.assess(&tx(50_000, "India", "B", "NEFT"), &history, None);
        assert_eq!(a.breakdown.anomaly, 100);
        assert_eq!(a.breakdown.contextual, 0);
    }

    #[test]
    fn test_component_scores_stay_in_range() {
        let engine = ScoringEngine::new(Arc::new(RiskConfig::default()));
        let mut history = AccountHistoryEntry::default();
        history.transaction_count = 40;
        history.last_beneficiary = Some("Offshore Trust".to_string());
        history.beneficiary_counts.insert("Offshore Trust".to_string(), 40);
        history.distinct_beneficiaries.insert("Offshore Trust".to_string());
        let a = engine.assess(
            &tx(2_000_000, "Cayman", "Offshore Trust", "CASH"),
            &history,
            None,
        );
        for score in [
            a.breakdown.rules,
            a.breakdown.velocity,
            a.breakdown.anomaly,
            a.breakdown.contextual,
            a.total,
        ] {
            assert!(score <= 100);
        }
        assert_eq!(a.level, RiskLevel::Critical);
    }
}
