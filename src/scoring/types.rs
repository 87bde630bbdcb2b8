use serde::Serialize;

/// Display band derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// Output of the rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulesOutcome {
    pub score: u8,
    pub is_high_risk_jurisdiction: bool,
    pub is_structuring: bool,
}

/// Output of the velocity and pattern detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocityOutcome {
    pub score: u8,
    /// Session count for the sender including this transaction.
    pub session_count: u32,
    /// Transfers to this beneficiary in the session including this one.
    pub pair_count: u32,
    pub distinct_beneficiaries: usize,
    pub is_high_velocity: bool,
    pub is_linked_series: bool,
    pub is_tunneling: bool,
    pub is_burst: bool,
    pub is_burst_same_target: bool,
    pub is_fan_out: bool,
}

/// Every signal computed for one transaction, consumed by the score simulators
/// and the report assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signals {
    pub rules: RulesOutcome,
    pub velocity: VelocityOutcome,
    pub is_high_value: bool,
    pub is_round_amount: bool,
    pub has_shell_keyword: bool,
    pub is_high_risk_channel: bool,
}

/// Independent component scores, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub rules: u8,
    pub velocity: u8,
    pub anomaly: u8,
    pub contextual: u8,
}

/// Final assessment of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskScore {
    pub transaction_id: String,
    pub score: u8,
    pub risk_level: RiskLevel,
    pub is_high_risk: bool,
    pub reasons: Vec<String>,
    pub velocity_count: u32,
    pub breakdown: ScoreBreakdown,
    pub explanation: String,
}
