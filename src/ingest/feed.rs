use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::str::FromStr;

use super::types::{Transaction, TransactionRecord, TransactionStatus};

/// First sequence number handed out when no transactions have been ingested yet.
const FIRST_SEQUENCE: u64 = 1001;

/// The feed may carry a single record or an ordered batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Feed {
    Batch(Vec<TransactionRecord>),
    Single(TransactionRecord),
}

/// Parse a JSON feed document into raw records, preserving arrival order.
pub fn parse_feed(content: &str) -> eyre::Result<Vec<TransactionRecord>> {
    let feed: Feed = serde_json::from_str(content)
        .map_err(|e| eyre::eyre!("Failed to parse transaction feed: {}", e))?;
    Ok(match feed {
        Feed::Batch(records) => records,
        Feed::Single(record) => vec![record],
    })
}

/// A record refused at the boundary, with its position in the feed.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub position: usize,
    pub reason: String,
}

/// Validates raw records and assigns transaction identifiers.
/// Identifiers are sequential (`TX-1001`, `TX-1002`, ...) across the whole session.
#[derive(Debug)]
pub struct Ingestor {
    next_sequence: u64,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Ingestor {
    /// Start numbering after `already_ingested` previously admitted transactions.
    pub fn new(already_ingested: u64) -> Self {
        Self {
            next_sequence: FIRST_SEQUENCE + already_ingested,
        }
    }

    /// Validate one record. Malformed records are rejected and consume no identifier.
    pub fn admit(&mut self, record: TransactionRecord) -> eyre::Result<Transaction> {
        let amount = parse_amount(record.amount.as_ref())?;

        let from_account = record.from_account.trim().to_string();
        if from_account.is_empty() {
            return Err(eyre::eyre!("Missing originator account identifier"));
        }
        let to_account = record.to_account.trim().to_string();
        if to_account.is_empty() {
            return Err(eyre::eyre!("Missing beneficiary account identifier"));
        }

        let timestamp = match record.timestamp.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| eyre::eyre!("Unparseable timestamp '{}': {}", raw, e))?
                    .with_timezone(&Utc),
            ),
        };

        let id = format!("TX-{}", self.next_sequence);
        self.next_sequence += 1;

        Ok(Transaction {
            id,
            amount,
            currency: record.currency.trim().to_string(),
            from_account,
            to_account,
            receiver_country: record.receiver_country.trim().to_string(),
            transfer_type: record.transfer_type.trim().to_string(),
            location: record.location.trim().to_string(),
            timestamp,
            status: TransactionStatus::Pending,
        })
    }

    /// Validate an ordered batch. Admitted transactions keep their relative order.
    pub fn admit_batch(
        &mut self,
        records: Vec<TransactionRecord>,
    ) -> (Vec<Transaction>, Vec<Rejection>) {
        let mut admitted = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();

        for (position, record) in records.into_iter().enumerate() {
            match self.admit(record) {
                Ok(tx) => admitted.push(tx),
                Err(e) => {
                    tracing::warn!(position, error = %e, "Rejected malformed transaction record");
                    rejected.push(Rejection {
                        position,
                        reason: e.to_string(),
                    });
                }
            }
        }

        (admitted, rejected)
    }
}

fn parse_amount(value: Option<&JsonValue>) -> eyre::Result<BigDecimal> {
    let amount = match value {
        None | Some(JsonValue::Null) => return Err(eyre::eyre!("Missing amount")),
        Some(JsonValue::Number(n)) => BigDecimal::from_str(&n.to_string())
            .map_err(|e| eyre::eyre!("Unparseable amount '{}': {}", n, e))?,
        Some(JsonValue::String(s)) => BigDecimal::from_str(s.trim())
            .map_err(|e| eyre::eyre!("Unparseable amount '{}': {}", s, e))?,
        Some(other) => return Err(eyre::eyre!("Unparseable amount '{}'", other)),
    };

    if amount <= BigDecimal::zero() {
        return Err(eyre::eyre!("Amount must be positive, got {}", amount));
    }
    Ok(amount)
}
