use crate::config::{RiskConfig, VelocityConfig};
use crate::history::store::AccountHistoryEntry;
use crate::ingest::types::Transaction;

use super::types::VelocityOutcome;

/// Tiered step function over the session count. Picks the highest tier reached.
pub fn base_score(session_count: u32, config: &VelocityConfig) -> u32 {
    config
        .tiers
        .iter()
        .filter(|tier| session_count >= tier.min_count)
        .map(|tier| tier.score)
        .max()
        .unwrap_or(config.floor_score)
        .max(config.floor_score)
}

/// Check if the previous transfer from this sender falls inside the burst window.
/// Without timestamps on both sides, the immediately prior transfer counts as a burst.
fn check_burst(tx: &Transaction, history: &AccountHistoryEntry, window_secs: i64) -> bool {
    if history.transaction_count == 0 {
        return false;
    }
    match (tx.timestamp, history.last_timestamp) {
        (Some(current), Some(previous)) => {
            (current - previous).num_seconds().abs() <= window_secs
        }
        _ => true,
    }
}

/// Compute velocity and pattern signals for `tx` against its sender's history.
///
/// `count_override` replaces the derived session count when the caller has already
/// advanced it for this transaction. The history entry is never modified here.
pub fn detect(
    tx: &Transaction,
    history: &AccountHistoryEntry,
    config: &RiskConfig,
    count_override: Option<u32>,
) -> VelocityOutcome {
    let v = &config.velocity;

    let session_count = count_override.unwrap_or(history.transaction_count + 1);
    let mut score = base_score(session_count, v);

    let pair_count = history.count_to(&tx.to_account) + 1;
    let is_linked_series = pair_count >= 2;
    if is_linked_series {
        score = score
            .saturating_add(v.linked_series_boost)
            .max(v.linked_series_floor);
    }

    let is_tunneling = pair_count >= v.tunneling_min_repeats.max(1);
    if is_tunneling {
        let repeats = pair_count - v.tunneling_min_repeats.max(1) + 1;
        score = score.saturating_add(v.tunneling_per_repeat.saturating_mul(repeats));
    }

    let is_burst = check_burst(tx, history, v.burst_window_secs);
    let is_burst_same_target =
        is_burst && history.last_beneficiary.as_deref() == Some(tx.to_account.as_str());
    if is_burst_same_target {
        score = score.saturating_add(v.burst_same_target_penalty);
    } else if is_burst {
        score = score.saturating_add(v.burst_penalty);
    }

    let distinct_beneficiaries = if history.distinct_beneficiaries.contains(&tx.to_account) {
        history.distinct_beneficiaries.len()
    } else {
        history.distinct_beneficiaries.len() + 1
    };
    let is_fan_out = session_count >= v.fan_out_min_count
        && distinct_beneficiaries >= v.fan_out_min_beneficiaries;
    if is_fan_out {
        score = score.saturating_add(v.fan_out_penalty);
    }

    let score = score.min(100) as u8;

    VelocityOutcome {
        score,
        session_count,
        pair_count,
        distinct_beneficiaries,
        is_high_velocity: u32::from(score) >= config.high_velocity_threshold,
        is_linked_series,
        is_tunneling,
        is_burst,
        is_burst_same_target,
        is_fan_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::store::AccountHistoryStore;
    use crate::ingest::types::TransactionStatus;
    use bigdecimal::BigDecimal;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn tx(id: &str, to: &str, at: Option<DateTime<Utc>>) -> Transaction {
        Transaction {
            id: id.to_string(),
            amount: BigDecimal::from(9_500),
            currency: "INR".to_string(),
            from_account: "ACC-MULE".to_string(),
            to_account: to.to_string(),
            receiver_country: "India".to_string(),
            transfer_type: "IMPS".to_string(),
            location: "Pune".to_string(),
            timestamp: at,
            status: TransactionStatus::Pending,
        }
    }

    /// Score each transaction then commit it, as the orchestrator does.
    fn run(txs: &[Transaction]) -> Vec<VelocityOutcome> {
        let config = RiskConfig::default();
        let mut store = AccountHistoryStore::new();
        txs.iter()
            .map(|t| {
                let outcome = detect(t, &store.lookup(&t.from_account), &config, None);
                store.commit(&t.from_account, t);
                outcome
            })
            .collect()
    }

    #[test]
    fn test_base_score_tiers() {
        let config = VelocityConfig::default();
        assert_eq!(base_score(1, &config), 10);
        assert_eq!(base_score(2, &config), 40);
        assert_eq!(base_score(3, &config), 80);
        assert_eq!(base_score(4, &config), 80);
        assert_eq!(base_score(5, &config), 95);
        assert_eq!(base_score(50, &config), 95);
    }

    #[test]
    fn test_base_score_is_monotonic() {
        let config = VelocityConfig::default();
        let mut previous = 0;
        for count in 0..20 {
            let score = base_score(count, &config);
            assert!(score >= previous);
            previous = score;
        }
    }

    #[test]
    fn test_first_transaction_is_quiet() {
        let outcome = &run(&[tx("TX-1", "B1", Some(base_time()))])[0];
        assert_eq!(outcome.session_count, 1);
        assert_eq!(outcome.score, 10);
        assert!(!outcome.is_burst);
        assert!(!outcome.is_linked_series);
        assert!(!outcome.is_high_velocity);
    }

    #[test]
    fn test_tunneling_burst_to_same_beneficiary() {
        let txs: Vec<_> = (0..5)
            .map(|i| {
                tx(
                    &format!("TX-{}", i),
                    "ACC-MULE-TARGET",
                    Some(base_time() + Duration::seconds(i * 10)),
                )
            })
            .collect();
        let outcomes = run(&txs);

        assert!(!outcomes[1].is_tunneling);
        assert!(outcomes[1].is_linked_series);
        assert!(outcomes[1].is_burst_same_target);

        let last = &outcomes[4];
        assert_eq!(last.session_count, 5);
        assert_eq!(last.pair_count, 5);
        assert!(last.is_tunneling);
        assert!(last.is_burst);
        assert!(last.is_burst_same_target);
        assert!(!last.is_fan_out);
        assert_eq!(last.score, 100);
        assert!(last.is_high_velocity);
    }

    #[test]
    fn test_burst_outside_window() {
        let outcomes = run(&[
            tx("TX-1", "B1", Some(base_time())),
            tx("TX-2", "B2", Some(base_time() + Duration::minutes(30))),
        ]);
        assert!(!outcomes[1].is_burst);
        assert_eq!(outcomes[1].score, 40);
    }

    #[test]
    fn test_burst_without_timestamps_uses_adjacency() {
        let outcomes = run(&[tx("TX-1", "B1", None), tx("TX-2", "B2", None)]);
        assert!(outcomes[1].is_burst);
        assert!(!outcomes[1].is_burst_same_target);
        assert_eq!(outcomes[1].score, 50);
    }

    #[test]
    fn test_fan_out_to_distinct_beneficiaries() {
        let outcomes = run(&[
            tx("TX-1", "B1", None),
            tx("TX-2", "B2", None),
            tx("TX-3", "B3", None),
            tx("TX-4", "B4", None),
        ]);
        assert!(!outcomes[2].is_fan_out);
        let last = &outcomes[3];
        assert_eq!(last.distinct_beneficiaries, 4);
        assert!(last.is_fan_out);
        assert!(!last.is_tunneling);
    }

    #[test]
    fn test_burst_window_is_inclusive() {
        let at_edge = run(&[
            tx("TX-1", "B1", Some(base_time())),
            tx("TX-2", "B2", Some(base_time() + Duration::seconds(120))),
        ]);
        assert!(at_edge[1].is_burst);

        let past_edge = run(&[
            tx("TX-1", "B1", Some(base_time())),
            tx("TX-2", "B2", Some(base_time() + Duration::seconds(121))),
        ]);
        assert!(!past_edge[1].is_burst);
        assert_eq!(past_edge[1].score, 40);
    }

    #[test]
    fn test_fan_out_needs_distinct_beneficiaries() {
        let outcomes = run(&[
            tx("TX-1", "B1", None),
            tx("TX-2", "B2", None),
            tx("TX-3", "B1", None),
            tx("TX-4", "B2", None),
        ]);
        let last = &outcomes[3];
        assert_eq!(last.session_count, 4);
        assert_eq!(last.distinct_beneficiaries, 2);
        assert!(!last.is_fan_out);
    }

    #[test]
    fn test_oversized_penalties_saturate() {
        let mut config = RiskConfig::default();
        config.velocity.linked_series_boost = u32::MAX;
        config.velocity.tunneling_per_repeat = u32::MAX;
        config.velocity.burst_same_target_penalty = u32::MAX;
        config.velocity.fan_out_penalty = u32::MAX;

        let mut store = AccountHistoryStore::new();
        let mut last = None;
        for i in 0..6 {
            let t = tx(&format!("TX-{}", i), "B1", None);
            last = Some(detect(&t, &store.lookup(&t.from_account), &config, None));
            store.commit(&t.from_account, &t);
        }
        let last = last.unwrap();
        assert!(last.is_tunneling);
        assert_eq!(last.score, 100);
    }

    #[test]
    fn test_count_override_replaces_session_count() {
        let config = RiskConfig::default();
        let history = AccountHistoryEntry::default();
        let outcome = detect(&tx("TX-1", "B1", None), &history, &config, Some(5));
        assert_eq!(outcome.session_count, 5);
        assert_eq!(outcome.score, 95);
    }

    #[test]
    fn test_increasing_session_count_never_lowers_score() {
        let config = RiskConfig::default();
        let mut store = AccountHistoryStore::new();
        for (i, to) in ["B1", "B2", "B1", "B3"].iter().enumerate() {
            let t = tx(&format!("TX-{}", i), to, None);
            store.commit("ACC-MULE", &t);
        }
        let history = store.lookup("ACC-MULE");
        let probe = tx("TX-PROBE", "B2", None);

        let mut previous = 0;
        for count in 1..12 {
            let outcome = detect(&probe, &history, &config, Some(count));
            assert!(outcome.score >= previous, "count {}", count);
            previous = outcome.score;
        }
    }

    #[test]
    fn test_detect_does_not_mutate_history() {
        let config = RiskConfig::default();
        let mut store = AccountHistoryStore::new();
        store.commit("ACC-MULE", &tx("TX-1", "B1", None));
        let before = store.lookup("ACC-MULE").into_owned();
        let first = detect(&tx("TX-2", "B1", None), &store.lookup("ACC-MULE"), &config, None);
        let second = detect(&tx("TX-2", "B1", None), &store.lookup("ACC-MULE"), &config, None);
        assert_eq!(first, second);
        assert_eq!(*store.lookup("ACC-MULE"), before);
    }
}
