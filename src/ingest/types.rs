use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Lifecycle state of a transaction. Set exactly once when the pipeline completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Processed,
    Flagged,
}

/// A validated transaction admitted by the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub from_account: String,
    pub to_account: String,
    pub receiver_country: String,
    #[serde(rename = "type")]
    pub transfer_type: String,
    pub location: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
}

impl Transaction {
    /// Amount as a float for threshold comparisons.
    pub fn amount_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or(0.0)
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    /// Consume the pending transaction and stamp its terminal status.
    /// A transaction that already left `Pending` is rejected unchanged.
    pub fn finalize(self, flagged: bool) -> eyre::Result<Self> {
        if !self.is_pending() {
            return Err(eyre::eyre!(
                "Transaction {} is already {:?}",
                self.id,
                self.status
            ));
        }
        Ok(Self {
            status: if flagged {
                TransactionStatus::Flagged
            } else {
                TransactionStatus::Processed
            },
            ..self
        })
    }
}

/// A raw record from the input feed, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionRecord {
    pub amount: Option<JsonValue>,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub from_account: String,
    #[serde(default)]
    pub to_account: String,
    #[serde(default)]
    pub receiver_country: String,
    #[serde(rename = "type", default)]
    pub transfer_type: String,
    #[serde(default)]
    pub location: String,
    pub timestamp: Option<String>,
}
