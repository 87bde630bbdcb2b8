use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use crate::ingest::types::Transaction;

/// Session state for one sending account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountHistoryEntry {
    pub transaction_count: u32,
    pub last_beneficiary: Option<String>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub beneficiary_counts: HashMap<String, u32>,
    pub distinct_beneficiaries: BTreeSet<String>,
    /// Identifiers of committed transactions, in arrival order.
    pub session: Vec<String>,
}

impl AccountHistoryEntry {
    /// Prior transfers from this account to `beneficiary` in the session.
    pub fn count_to(&self, beneficiary: &str) -> u32 {
        self.beneficiary_counts.get(beneficiary).copied().unwrap_or(0)
    }

    fn record(&mut self, tx: &Transaction) {
        self.transaction_count += 1;
        self.last_beneficiary = Some(tx.to_account.clone());
        self.last_timestamp = tx.timestamp;
        *self
            .beneficiary_counts
            .entry(tx.to_account.clone())
            .or_default() += 1;
        self.distinct_beneficiaries.insert(tx.to_account.clone());
        self.session.push(tx.id.clone());
    }
}

/// Per-sender session history, keyed by originator account.
/// Updated incrementally so velocity signals never rescan the transaction log.
#[derive(Debug, Default)]
pub struct AccountHistoryStore {
    entries: HashMap<String, AccountHistoryEntry>,
}

impl AccountHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// History for `account`. Unknown accounts read as an empty entry.
    pub fn lookup(&self, account: &str) -> Cow<'_, AccountHistoryEntry> {
        match self.entries.get(account) {
            Some(entry) => Cow::Borrowed(entry),
            None => Cow::Owned(AccountHistoryEntry::default()),
        }
    }

    /// Append a scored transaction to its sender's session.
    pub fn commit(&mut self, account: &str, tx: &Transaction) {
        self.entries
            .entry(account.to_string())
            .or_default()
            .record(tx);
    }

    /// Remove an account's entry so a single worker can own it for a batch.
    pub fn detach(&mut self, account: &str) -> AccountHistoryEntry {
        self.entries.remove(account).unwrap_or_default()
    }

    /// Return an entry previously taken with [`detach`](Self::detach).
    pub fn attach(&mut self, account: String, entry: AccountHistoryEntry) {
        if entry.transaction_count > 0 {
            self.entries.insert(account, entry);
        }
    }

    /// Drop all session state at a session boundary.
    pub fn reset(&mut self) {
        tracing::info!(accounts = self.entries.len(), "Resetting account history session");
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, AccountHistoryEntry)> {
        self.entries.into_iter()
    }
}
