use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::config::{Config, RiskConfig};
use crate::history::store::{AccountHistoryEntry, AccountHistoryStore};
use crate::ingest::types::Transaction;
use crate::report::assembler;
use crate::report::narrative::NarrativeEnricher;
use crate::report::types::SuspiciousActivityReport;
use crate::scoring::engine::ScoringEngine;
use crate::scoring::types::RiskScore;

/// Outcome of running the pipeline on one transaction.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredTransaction {
    pub transaction: Transaction,
    pub risk_score: RiskScore,
    pub report: SuspiciousActivityReport,
}

/// Counters for one processed batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: u64,
    pub flagged: u64,
    pub enriched: u64,
}

/// Orchestrates scoring for single transactions and batches:
/// 1. Rules engine + velocity detector read the sender's history
/// 2. Score simulators consume the signals
/// 3. Aggregator classifies, assembler renders score and report
/// 4. History is committed only after the score is final
/// 5. Flagged reports are optionally enriched by the narrative service
pub struct RiskPipeline {
    engine: ScoringEngine,
    history: AccountHistoryStore,
    enricher: Option<NarrativeEnricher>,
    workers: usize,
    /// Transaction ids scored since the last session reset.
    scored_ids: HashSet<String>,
}

impl RiskPipeline {
    pub fn new(config: Arc<RiskConfig>) -> Self {
        Self {
            engine: ScoringEngine::new(config),
            history: AccountHistoryStore::new(),
            enricher: None,
            workers: 1,
            scored_ids: HashSet::new(),
        }
    }

    /// Build the pipeline from validated configuration.
    pub fn init(config: &Config) -> Self {
        let enricher = NarrativeEnricher::from_config(&config.narrative);
        if enricher.is_none() {
            tracing::info!("Narrative service not configured, using deterministic narratives");
        }

        Self {
            engine: ScoringEngine::new(Arc::new(config.scoring.clone())),
            history: AccountHistoryStore::new(),
            enricher,
            workers: config.pipeline.workers.max(1),
            scored_ids: HashSet::new(),
        }
    }

    pub fn with_engine(mut self, engine: ScoringEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_enricher(mut self, enricher: NarrativeEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn history(&self) -> &AccountHistoryStore {
        &self.history
    }

    /// Score a transaction against current history without committing it.
    pub fn preview(&self, tx: &Transaction) -> RiskScore {
        let assessment = self
            .engine
            .assess(tx, &self.history.lookup(&tx.from_account), None);
        assembler::build_risk_score(tx, &assessment, self.engine.config())
    }

    /// Score one transaction and commit it to its sender's history.
    ///
    /// Fails without touching history if the transaction is no longer pending or its
    /// id was already scored in this session.
    pub fn process(&mut self, tx: Transaction) -> eyre::Result<ScoredTransaction> {
        self.claim(&tx)?;
        let id = tx.id.clone();
        let result = score_and_commit(&self.engine, &mut self.history, tx);
        if result.is_err() {
            self.scored_ids.remove(&id);
        }
        result
    }

    /// Score a batch in arrival order. Each transaction sees every earlier one.
    /// Transactions `process` rejects are logged and left out of the result.
    pub fn process_batch(&mut self, transactions: Vec<Transaction>) -> Vec<ScoredTransaction> {
        transactions
            .into_iter()
            .filter_map(|tx| match self.process(tx) {
                Ok(scored) => Some(scored),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping transaction");
                    None
                }
            })
            .collect()
    }

    /// Score a batch with senders partitioned across worker shards.
    ///
    /// Each shard exclusively owns the history entries of its accounts for the
    /// duration of the batch; per-account arrival order is preserved. Results are
    /// identical to [`process_batch`](Self::process_batch) and returned in arrival order.
    /// If any shard fails, history and scored ids are restored to their pre-batch state.
    pub async fn process_batch_sharded(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> eyre::Result<Vec<ScoredTransaction>> {
        let mut accepted = Vec::with_capacity(transactions.len());
        for tx in transactions {
            match self.claim(&tx) {
                Ok(()) => accepted.push(tx),
                Err(e) => tracing::warn!(error = %e, "Skipping transaction"),
            }
        }

        let total = accepted.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let claimed: Vec<String> = accepted.iter().map(|tx| tx.id.clone()).collect();

        let shard_count = self.workers.min(total);
        let mut shards: Vec<Vec<(usize, Transaction)>> = vec![Vec::new(); shard_count];
        for (position, tx) in accepted.into_iter().enumerate() {
            shards[shard_for(&tx.from_account, shard_count)].push((position, tx));
        }

        let mut snapshot: Vec<(String, AccountHistoryEntry)> = Vec::new();
        let mut handles = Vec::with_capacity(shard_count);
        for shard in shards.into_iter().filter(|s| !s.is_empty()) {
            let mut store = AccountHistoryStore::new();
            let accounts: HashSet<&str> = shard.iter().map(|(_, tx)| tx.from_account.as_str()).collect();
            for account in accounts {
                let entry = self.history.detach(account);
                snapshot.push((account.to_string(), entry.clone()));
                store.attach(account.to_string(), entry);
            }

            let engine = self.engine.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let scored = shard
                    .into_iter()
                    .map(|(position, tx)| {
                        score_and_commit(&engine, &mut store, tx).map(|result| (position, result))
                    })
                    .collect::<eyre::Result<Vec<_>>>()?;
                Ok::<_, eyre::Report>((scored, store))
            }));
        }

        let mut completed = Vec::with_capacity(handles.len());
        let mut failure = None;
        for output in futures::future::join_all(handles).await {
            match output {
                Ok(Ok(done)) => completed.push(done),
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    failure.get_or_insert(eyre::eyre!("Scoring worker failed: {}", e));
                }
            }
        }

        if let Some(e) = failure {
            tracing::error!(
                error = %e,
                accounts = snapshot.len(),
                "Sharded batch failed, restoring pre-batch history"
            );
            for (account, entry) in snapshot {
                self.history.attach(account, entry);
            }
            for id in &claimed {
                self.scored_ids.remove(id);
            }
            return Err(e);
        }

        let mut slots: Vec<Option<ScoredTransaction>> = (0..total).map(|_| None).collect();
        for (scored, store) in completed {
            for (account, entry) in store.into_entries() {
                self.history.attach(account, entry);
            }
            for (position, result) in scored {
                slots[position] = Some(result);
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Ask the narrative service for prose on every flagged report, at most
    /// `workers` requests at a time. Returns the number of narratives replaced.
    pub async fn enrich(&self, scored: &mut [ScoredTransaction]) -> u64 {
        let Some(enricher) = &self.enricher else {
            return 0;
        };

        let pending = scored
            .iter_mut()
            .filter(|s| s.risk_score.is_high_risk)
            .map(|s| {
                let ScoredTransaction {
                    transaction,
                    risk_score,
                    report,
                } = s;
                enricher.enrich(transaction, risk_score, report)
            });

        let outcomes: Vec<bool> = futures::stream::iter(pending)
            .buffer_unordered(self.workers)
            .collect()
            .await;
        outcomes.into_iter().filter(|replaced| *replaced).count() as u64
    }

    /// Score, commit and enrich a batch.
    pub async fn run(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> eyre::Result<(Vec<ScoredTransaction>, BatchSummary)> {
        let mut scored = if self.workers > 1 {
            self.process_batch_sharded(transactions).await?
        } else {
            self.process_batch(transactions)
        };

        let enriched = self.enrich(&mut scored).await;
        let summary = BatchSummary {
            processed: scored.len() as u64,
            flagged: scored.iter().filter(|s| s.risk_score.is_high_risk).count() as u64,
            enriched,
        };

        tracing::info!(
            processed = summary.processed,
            flagged = summary.flagged,
            enriched = summary.enriched,
            "Batch scored"
        );

        Ok((scored, summary))
    }

    /// Clear account history and scored ids at a session boundary.
    pub fn reset_session(&mut self) {
        self.history.reset();
        self.scored_ids.clear();
    }

    /// Reserve `tx.id` for scoring in this session.
    fn claim(&mut self, tx: &Transaction) -> eyre::Result<()> {
        if !tx.is_pending() {
            return Err(eyre::eyre!(
                "Transaction {} is already {:?}",
                tx.id,
                tx.status
            ));
        }
        if !self.scored_ids.insert(tx.id.clone()) {
            return Err(eyre::eyre!(
                "Transaction {} was already scored in this session",
                tx.id
            ));
        }
        Ok(())
    }
}

fn shard_for(account: &str, shard_count: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    account.hash(&mut hasher);
    (hasher.finish() % shard_count as u64) as usize
}

/// History is committed only once the transaction has been finalized.
fn score_and_commit(
    engine: &ScoringEngine,
    history: &mut AccountHistoryStore,
    tx: Transaction,
) -> eyre::Result<ScoredTransaction> {
    let assessment = engine.assess(&tx, &history.lookup(&tx.from_account), None);
    let risk_score = assembler::build_risk_score(&tx, &assessment, engine.config());
    let report = assembler::build_report(&tx, &risk_score, &assessment, engine.config(), Utc::now());

    let transaction = tx.finalize(risk_score.is_high_risk)?;
    history.commit(&transaction.from_account, &transaction);

    if risk_score.is_high_risk {
        tracing::warn!(
            transaction = %transaction.id,
            score = risk_score.score,
            level = risk_score.risk_level.as_str(),
            reasons = ?risk_score.reasons,
            "SUSPICIOUS TRANSACTION FLAGGED"
        );
    }

    Ok(ScoredTransaction {
        transaction,
        risk_score,
        report,
    })
}
