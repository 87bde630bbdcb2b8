use crate::config::{RiskConfig, RiskLevelConfig, WeightsConfig};

use super::types::{RiskLevel, ScoreBreakdown};

/// Weighted combination of the component scores, rounded to the nearest integer.
pub fn combine(breakdown: &ScoreBreakdown, weights: &WeightsConfig) -> u8 {
    let total = f64::from(breakdown.rules) * weights.rules
        + f64::from(breakdown.velocity) * weights.velocity
        + f64::from(breakdown.anomaly) * weights.anomaly
        + f64::from(breakdown.contextual) * weights.contextual;
    total.round().clamp(0.0, 100.0) as u8
}

/// Map a composite score to its display band. Scores on a cut point take the higher band.
pub fn classify(total: u8, levels: &RiskLevelConfig) -> RiskLevel {
    let total = u32::from(total);
    if total >= levels.critical {
        RiskLevel::Critical
    } else if total >= levels.high {
        RiskLevel::High
    } else if total >= levels.medium {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Flagging decision, independent of the display band.
pub fn is_high_risk(total: u8, config: &RiskConfig) -> bool {
    u32::from(total) >= config.high_risk_threshold
}
