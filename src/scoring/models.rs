//! Score simulators standing in for trained models.
//!
//! Both are pure functions of the signals already computed by the rules engine and
//! the velocity detector. A trained model can replace either by implementing the
//! corresponding trait.

use super::types::Signals;

/// Upper bound for simulated scores; 100 is left for a model's absolute certainty.
pub const SIMULATED_SCORE_CAP: u32 = 99;

/// Anomaly-detection capability.
pub trait AnomalyModel: Send + Sync {
    fn score(&self, signals: &Signals) -> u8;
}

/// Narrative/context-risk capability.
pub trait ContextModel: Send + Sync {
    fn score(&self, signals: &Signals) -> u8;
}

/// Additive heuristic over value, round-amount, velocity, jurisdiction and series signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnomalyModel;

impl HeuristicAnomalyModel {
    const BASELINE: u32 = 15;
    const HIGH_VALUE: u32 = 15;
    const ROUND_AMOUNT: u32 = 10;
    const HIGH_VELOCITY: u32 = 40;
    const JURISDICTION: u32 = 25;
    const LINKED_SERIES: u32 = 15;
}

impl AnomalyModel for HeuristicAnomalyModel {
    fn score(&self, signals: &Signals) -> u8 {
        let mut score = Self::BASELINE;
        if signals.is_high_value {
            score += Self::HIGH_VALUE;
        }
        if signals.is_round_amount {
            score += Self::ROUND_AMOUNT;
        }
        if signals.velocity.is_high_velocity {
            score += Self::HIGH_VELOCITY;
        }
        if signals.rules.is_high_risk_jurisdiction {
            score += Self::JURISDICTION;
        }
        if signals.velocity.is_linked_series || signals.velocity.is_tunneling {
            score += Self::LINKED_SERIES;
        }
        score.min(SIMULATED_SCORE_CAP) as u8
    }
}

/// Additive heuristic over jurisdiction, beneficiary naming, structuring and channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicContextModel;

impl HeuristicContextModel {
    const BASELINE: u32 = 10;
    const JURISDICTION: u32 = 45;
    const SHELL_KEYWORD: u32 = 25;
    const STRUCTURING: u32 = 20;
    const MACHINE_PATTERN: u32 = 15;
    const HIGH_RISK_CHANNEL: u32 = 10;
}

impl ContextModel for HeuristicContextModel {
    fn score(&self, signals: &Signals) -> u8 {
        let mut score = Self::BASELINE;
        if signals.rules.is_high_risk_jurisdiction {
            score += Self::JURISDICTION;
        }
        if signals.has_shell_keyword {
            score += Self::SHELL_KEYWORD;
        }
        if signals.rules.is_structuring {
            score += Self::STRUCTURING;
        }
        // High velocity with round amounts reads as scripted, machine-like activity.
        if signals.velocity.is_high_velocity && signals.is_round_amount {
            score += Self::MACHINE_PATTERN;
        }
        if signals.is_high_risk_channel {
            score += Self::HIGH_RISK_CHANNEL;
        }
        score.min(SIMULATED_SCORE_CAP) as u8
    }
}
