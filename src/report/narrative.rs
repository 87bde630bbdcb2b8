use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::NarrativeConfig;
use crate::ingest::types::Transaction;
use crate::scoring::types::RiskScore;

use super::types::SuspiciousActivityReport;

/// Request sent to the external narrative generator.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeRequest {
    pub transaction: Transaction,
    #[serde(rename = "velocityCount")]
    pub velocity_count: u32,
}

/// Expected response from the external narrative generator.
#[derive(Debug, Clone, Deserialize)]
pub struct NarrativeResponse {
    pub narrative: String,
    pub xml: String,
}

/// An external provider of prose narratives for flagged transactions.
#[async_trait]
pub trait NarrativeService: Send + Sync {
    async fn generate(&self, request: &NarrativeRequest) -> eyre::Result<NarrativeResponse>;
}

/// Runs a configured program, writing the request as JSON to its stdin and
/// reading a JSON response from its stdout.
#[derive(Debug, Clone)]
pub struct CommandNarrativeService {
    program: String,
    args: Vec<String>,
}

impl CommandNarrativeService {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from config. Returns None when no command is configured.
    pub fn from_config(config: &NarrativeConfig) -> Option<Self> {
        let (program, args) = config.command.as_ref()?.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl NarrativeService for CommandNarrativeService {
    async fn generate(&self, request: &NarrativeRequest) -> eyre::Result<NarrativeResponse> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| eyre::eyre!("Failed to start narrative command '{}': {}", self.program, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(eyre::eyre!(
                "Narrative command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| eyre::eyre!("Failed to parse narrative response: {}", e))
    }
}

/// Replaces deterministic narratives of flagged reports with external prose.
/// Every call is bounded by a timeout; on failure the deterministic report stays.
#[derive(Clone)]
pub struct NarrativeEnricher {
    service: Arc<dyn NarrativeService>,
    timeout: Duration,
}

impl NarrativeEnricher {
    pub fn new(service: Arc<dyn NarrativeService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Enricher backed by the configured command, if any.
    pub fn from_config(config: &NarrativeConfig) -> Option<Self> {
        let service = CommandNarrativeService::from_config(config)?;
        Some(Self::new(
            Arc::new(service),
            Duration::from_millis(config.timeout_ms),
        ))
    }

    /// Try to enrich one report. Returns true if the narrative was replaced.
    pub async fn enrich(
        &self,
        tx: &Transaction,
        risk: &RiskScore,
        report: &mut SuspiciousActivityReport,
    ) -> bool {
        if !risk.is_high_risk {
            return false;
        }

        let request = NarrativeRequest {
            transaction: tx.clone(),
            velocity_count: risk.velocity_count,
        };

        match tokio::time::timeout(self.timeout, self.service.generate(&request)).await {
            Ok(Ok(response)) if !response.narrative.trim().is_empty() => {
                report.replace_narrative(response.narrative, response.xml);
                tracing::debug!(transaction = %tx.id, "External narrative attached");
                true
            }
            Ok(Ok(_)) => {
                tracing::warn!(
                    transaction = %tx.id,
                    "Narrative service returned an empty narrative, keeping deterministic report"
                );
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    transaction = %tx.id,
                    error = %e,
                    "Narrative service failed, keeping deterministic report"
                );
                false
            }
            Err(_) => {
                tracing::warn!(
                    transaction = %tx.id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Narrative service timed out, keeping deterministic report"
                );
                false
            }
        }
    }
}
