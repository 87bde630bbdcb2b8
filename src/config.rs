use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scoring: RiskConfig,
    #[serde(default)]
    pub narrative: NarrativeConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

// ============================================================
// Risk Scoring Config
// ============================================================

/// Every threshold and weight used while scoring. Loaded once and shared read-only.
#[derive(Debug, Deserialize, Clone)]
pub struct RiskConfig {
    #[serde(default = "default_jurisdictions")]
    pub high_risk_jurisdictions: Vec<String>,
    #[serde(default = "default_jurisdiction_score_high")]
    pub jurisdiction_score_high: u32,
    #[serde(default = "default_jurisdiction_score_low")]
    pub jurisdiction_score_low: u32,
    #[serde(default)]
    pub structuring: StructuringConfig,
    #[serde(default = "default_high_value_threshold")]
    pub high_value_threshold: f64,
    #[serde(default)]
    pub velocity: VelocityConfig,
    #[serde(default)]
    pub round_number: RoundNumberConfig,
    #[serde(default = "default_shell_keywords")]
    pub shell_keywords: Vec<String>,
    #[serde(default = "default_high_risk_channels")]
    pub high_risk_channels: Vec<String>,
    #[serde(default = "default_high_velocity_threshold")]
    pub high_velocity_threshold: u32,
    #[serde(default = "default_high_risk_threshold")]
    pub high_risk_threshold: u32,
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub levels: RiskLevelConfig,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_risk_jurisdictions: default_jurisdictions(),
            jurisdiction_score_high: default_jurisdiction_score_high(),
            jurisdiction_score_low: default_jurisdiction_score_low(),
            structuring: StructuringConfig::default(),
            high_value_threshold: default_high_value_threshold(),
            velocity: VelocityConfig::default(),
            round_number: RoundNumberConfig::default(),
            shell_keywords: default_shell_keywords(),
            high_risk_channels: default_high_risk_channels(),
            high_velocity_threshold: default_high_velocity_threshold(),
            high_risk_threshold: default_high_risk_threshold(),
            weights: WeightsConfig::default(),
            levels: RiskLevelConfig::default(),
        }
    }
}

fn default_jurisdictions() -> Vec<String> {
    vec!["Seychelles".to_string(), "BVI".to_string(), "Cayman".to_string()]
}

fn default_jurisdiction_score_high() -> u32 {
    95
}

fn default_jurisdiction_score_low() -> u32 {
    10
}

fn default_high_value_threshold() -> f64 {
    1_000_000.0
}

fn default_shell_keywords() -> Vec<String> {
    ["holdings", "offshore", "shell", "nominee", "trust", "ventures"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_high_risk_channels() -> Vec<String> {
    vec!["CASH".to_string(), "CRYPTO".to_string()]
}

fn default_high_velocity_threshold() -> u32 {
    80
}

fn default_high_risk_threshold() -> u32 {
    45
}

#[derive(Debug, Deserialize, Clone)]
pub struct StructuringConfig {
    /// Mandatory reporting amount for the jurisdiction.
    #[serde(default = "default_reporting_threshold")]
    pub reporting_threshold: f64,
    /// Lower edge of the structuring band as a fraction of the reporting threshold.
    #[serde(default = "default_floor_ratio")]
    pub floor_ratio: f64,
    #[serde(default = "default_structuring_score")]
    pub score: u32,
}

impl Default for StructuringConfig {
    fn default() -> Self {
        Self {
            reporting_threshold: default_reporting_threshold(),
            floor_ratio: default_floor_ratio(),
            score: default_structuring_score(),
        }
    }
}

impl StructuringConfig {
    pub fn floor(&self) -> f64 {
        self.reporting_threshold * self.floor_ratio
    }
}

fn default_reporting_threshold() -> f64 {
    1_000_000.0
}

fn default_floor_ratio() -> f64 {
    0.9
}

fn default_structuring_score() -> u32 {
    85
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct VelocityTier {
    pub min_count: u32,
    pub score: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VelocityConfig {
    #[serde(default = "default_velocity_floor")]
    pub floor_score: u32,
    /// Medium, high and critical tiers, ascending by count.
    #[serde(default = "default_velocity_tiers")]
    pub tiers: Vec<VelocityTier>,
    #[serde(default = "default_linked_series_boost")]
    pub linked_series_boost: u32,
    #[serde(default = "default_linked_series_floor")]
    pub linked_series_floor: u32,
    #[serde(default = "default_tunneling_min_repeats")]
    pub tunneling_min_repeats: u32,
    #[serde(default = "default_tunneling_per_repeat")]
    pub tunneling_per_repeat: u32,
    #[serde(default = "default_burst_window")]
    pub burst_window_secs: i64,
    #[serde(default = "default_burst_penalty")]
    pub burst_penalty: u32,
    #[serde(default = "default_burst_same_target_penalty")]
    pub burst_same_target_penalty: u32,
    #[serde(default = "default_fan_out_min_count")]
    pub fan_out_min_count: u32,
    #[serde(default = "default_fan_out_min_beneficiaries")]
    pub fan_out_min_beneficiaries: usize,
    #[serde(default = "default_fan_out_penalty")]
    pub fan_out_penalty: u32,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            floor_score: default_velocity_floor(),
            tiers: default_velocity_tiers(),
            linked_series_boost: default_linked_series_boost(),
            linked_series_floor: default_linked_series_floor(),
            tunneling_min_repeats: default_tunneling_min_repeats(),
            tunneling_per_repeat: default_tunneling_per_repeat(),
            burst_window_secs: default_burst_window(),
            burst_penalty: default_burst_penalty(),
            burst_same_target_penalty: default_burst_same_target_penalty(),
            fan_out_min_count: default_fan_out_min_count(),
            fan_out_min_beneficiaries: default_fan_out_min_beneficiaries(),
            fan_out_penalty: default_fan_out_penalty(),
        }
    }
}

fn default_velocity_floor() -> u32 {
    10
}

fn default_velocity_tiers() -> Vec<VelocityTier> {
    vec![
        VelocityTier { min_count: 2, score: 40 },
        VelocityTier { min_count: 3, score: 80 },
        VelocityTier { min_count: 5, score: 95 },
    ]
}

fn default_linked_series_boost() -> u32 {
    15
}

fn default_linked_series_floor() -> u32 {
    50
}

fn default_tunneling_min_repeats() -> u32 {
    3
}

fn default_tunneling_per_repeat() -> u32 {
    5
}

fn default_burst_window() -> i64 {
    120
}

fn default_burst_penalty() -> u32 {
    10
}

fn default_burst_same_target_penalty() -> u32 {
    20
}

fn default_fan_out_min_count() -> u32 {
    4
}

fn default_fan_out_min_beneficiaries() -> usize {
    3
}

fn default_fan_out_penalty() -> u32 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoundNumberConfig {
    #[serde(default = "default_round_floor")]
    pub floor: f64,
    #[serde(default = "default_round_unit")]
    pub unit: f64,
    #[serde(default = "default_round_tolerance")]
    pub tolerance: f64,
}

impl Default for RoundNumberConfig {
    fn default() -> Self {
        Self {
            floor: default_round_floor(),
            unit: default_round_unit(),
            tolerance: default_round_tolerance(),
        }
    }
}

fn default_round_floor() -> f64 {
    10_000.0
}

fn default_round_unit() -> f64 {
    10_000.0
}

fn default_round_tolerance() -> f64 {
    0.01
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeightsConfig {
    #[serde(default = "default_rules_weight")]
    pub rules: f64,
    #[serde(default = "default_velocity_weight")]
    pub velocity: f64,
    #[serde(default = "default_anomaly_weight")]
    pub anomaly: f64,
    #[serde(default = "default_contextual_weight")]
    pub contextual: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            rules: default_rules_weight(),
            velocity: default_velocity_weight(),
            anomaly: default_anomaly_weight(),
            contextual: default_contextual_weight(),
        }
    }
}

impl WeightsConfig {
    pub fn sum(&self) -> f64 {
        self.rules + self.velocity + self.anomaly + self.contextual
    }
}

fn default_rules_weight() -> f64 {
    0.30
}

fn default_velocity_weight() -> f64 {
    0.35
}

fn default_anomaly_weight() -> f64 {
    0.25
}

fn default_contextual_weight() -> f64 {
    0.10
}

/// Display cut points. A score equal to a cut point belongs to the higher band.
#[derive(Debug, Deserialize, Clone)]
pub struct RiskLevelConfig {
    #[serde(default = "default_critical_cut")]
    pub critical: u32,
    #[serde(default = "default_high_cut")]
    pub high: u32,
    #[serde(default = "default_medium_cut")]
    pub medium: u32,
}

impl Default for RiskLevelConfig {
    fn default() -> Self {
        Self {
            critical: default_critical_cut(),
            high: default_high_cut(),
            medium: default_medium_cut(),
        }
    }
}

fn default_critical_cut() -> u32 {
    55
}

fn default_high_cut() -> u32 {
    40
}

fn default_medium_cut() -> u32 {
    25
}

impl RiskConfig {
    pub fn validate(&self) -> eyre::Result<()> {
        if self.high_risk_jurisdictions.is_empty() {
            return Err(eyre::eyre!(
                "At least one high-risk jurisdiction must be configured"
            ));
        }
        if self
            .high_risk_jurisdictions
            .iter()
            .any(|j| j.trim().is_empty())
        {
            return Err(eyre::eyre!("High-risk jurisdiction keywords must not be blank"));
        }

        let w = &self.weights;
        for (name, value) in [
            ("rules", w.rules),
            ("velocity", w.velocity),
            ("anomaly", w.anomaly),
            ("contextual", w.contextual),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(eyre::eyre!(
                    "Weight '{}' must be within [0, 1], got {}",
                    name,
                    value
                ));
            }
        }
        if (w.sum() - 1.0).abs() > 1e-6 {
            return Err(eyre::eyre!(
                "Component weights must sum to 1.0, got {:.6}",
                w.sum()
            ));
        }

        for (name, value) in [
            ("jurisdiction_score_high", self.jurisdiction_score_high),
            ("jurisdiction_score_low", self.jurisdiction_score_low),
            ("structuring.score", self.structuring.score),
            ("velocity.floor_score", self.velocity.floor_score),
            ("velocity.linked_series_floor", self.velocity.linked_series_floor),
            ("high_velocity_threshold", self.high_velocity_threshold),
            ("high_risk_threshold", self.high_risk_threshold),
            ("velocity.linked_series_boost", self.velocity.linked_series_boost),
            ("velocity.tunneling_per_repeat", self.velocity.tunneling_per_repeat),
            ("velocity.burst_penalty", self.velocity.burst_penalty),
            (
                "velocity.burst_same_target_penalty",
                self.velocity.burst_same_target_penalty,
            ),
            ("velocity.fan_out_penalty", self.velocity.fan_out_penalty),
        ] {
            if value > 100 {
                return Err(eyre::eyre!(
                    "'{}' must be a score within [0, 100], got {}",
                    name,
                    value
                ));
            }
        }

        for (name, value) in [
            ("high_value_threshold", self.high_value_threshold),
            ("structuring.reporting_threshold", self.structuring.reporting_threshold),
            ("round_number.floor", self.round_number.floor),
            ("round_number.tolerance", self.round_number.tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(eyre::eyre!(
                    "'{}' must be a non-negative number, got {}",
                    name,
                    value
                ));
            }
        }
        if !(self.structuring.floor_ratio > 0.0 && self.structuring.floor_ratio <= 1.0) {
            return Err(eyre::eyre!(
                "structuring.floor_ratio must be within (0, 1], got {}",
                self.structuring.floor_ratio
            ));
        }
        if !(self.round_number.unit > 0.0) {
            return Err(eyre::eyre!("round_number.unit must be positive"));
        }
        if self.velocity.burst_window_secs < 0 {
            return Err(eyre::eyre!("velocity.burst_window_secs must be non-negative"));
        }

        let tiers = &self.velocity.tiers;
        if tiers.is_empty() {
            return Err(eyre::eyre!("At least one velocity tier must be configured"));
        }
        for tier in tiers {
            if tier.score > 100 {
                return Err(eyre::eyre!(
                    "Velocity tier for count {} has score {} above 100",
                    tier.min_count,
                    tier.score
                ));
            }
        }
        for pair in tiers.windows(2) {
            if pair[1].min_count <= pair[0].min_count || pair[1].score < pair[0].score {
                return Err(eyre::eyre!(
                    "Velocity tiers must ascend by count with non-decreasing scores"
                ));
            }
        }

        let l = &self.levels;
        if !(l.medium <= l.high && l.high <= l.critical && l.critical <= 100) {
            return Err(eyre::eyre!(
                "Risk level cut points must satisfy medium <= high <= critical <= 100 (got {}/{}/{})",
                l.medium,
                l.high,
                l.critical
            ));
        }

        Ok(())
    }
}

// ============================================================
// Narrative Service Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct NarrativeConfig {
    /// Program and arguments of the external narrative generator. Disabled when absent.
    pub command: Option<Vec<String>>,
    #[serde(default = "default_narrative_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_ms: default_narrative_timeout_ms(),
        }
    }
}

fn default_narrative_timeout_ms() -> u64 {
    5000
}

// ============================================================
// Pipeline Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    4
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        self.scoring.validate()?;
        if self.narrative.timeout_ms == 0 {
            return Err(eyre::eyre!("narrative.timeout_ms must be greater than zero"));
        }
        if let Some(command) = &self.narrative.command {
            if command.is_empty() || command[0].trim().is_empty() {
                return Err(eyre::eyre!("narrative.command must name a program"));
            }
        }
        if self.pipeline.workers == 0 {
            return Err(eyre::eyre!("pipeline.workers must be at least 1"));
        }
        Ok(())
    }
}
