use chrono::{DateTime, Utc};
use serde::Serialize;

/// Dominant money-laundering pattern named in a flagged report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Typology {
    ShellCompany,
    Dispersion,
    Structuring,
    Layering,
}

impl Typology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShellCompany => "shell_company",
            Self::Dispersion => "dispersion",
            Self::Structuring => "structuring",
            Self::Layering => "layering",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ShellCompany => "shell company operations",
            Self::Dispersion => "dispersion",
            Self::Structuring => "structuring/smurfing",
            Self::Layering => "layering/round-tripping",
        }
    }
}

/// Where a report's narrative and payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NarrativeSource {
    Deterministic,
    External,
}

/// Suspicious transaction report for one scored transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuspiciousActivityReport {
    pub id: String,
    pub transaction_id: String,
    pub typology: Option<Typology>,
    pub narrative: String,
    pub xml_payload: String,
    pub generated_at: DateTime<Utc>,
    pub is_filed: bool,
    pub source: NarrativeSource,
}

impl SuspiciousActivityReport {
    /// Swap in an externally generated narrative and payload, wholesale.
    pub fn replace_narrative(&mut self, narrative: String, xml_payload: String) {
        self.narrative = narrative;
        self.xml_payload = xml_payload;
        self.source = NarrativeSource::External;
    }
}
