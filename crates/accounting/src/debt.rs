//! Floating debt: the running sum of flows attached to remote transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use finledger_core::{
    AgentId, CurrencyId, DomainError, DomainResult, FlowId, TransactionId, checked_sum,
    index_by_id, signed_effect,
};
use finledger_events::{Counterparty, Flow, Projection, Transaction, try_replay};

use crate::query::{DateRange, Pagination, matches_search};

/// How a debt flow moves the net position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtPolarity {
    /// A debt flow subtracts its amount, a credit flow adds it.
    #[default]
    DebtReducesNetPosition,
    /// A debt flow adds its amount, a credit flow subtracts it.
    DebtIncreasesNetPosition,
}

impl DebtPolarity {
    pub fn effect(self, flow: &Flow) -> DomainResult<i64> {
        let negative = match self {
            DebtPolarity::DebtReducesNetPosition => flow.is_debt,
            DebtPolarity::DebtIncreasesNetPosition => !flow.is_debt,
        };
        signed_effect(flow.amount, negative)
    }
}

/// A flow stamped with the data of the transaction that owns it.
#[derive(Debug, Clone)]
pub struct JoinedFlow {
    pub flow: Flow,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
    pub comment: String,
}

impl JoinedFlow {
    fn new(flow: &Flow, transaction: &Transaction) -> Self {
        Self {
            flow: flow.clone(),
            transaction_id: transaction.id,
            occurred_at: transaction.occurred_at,
            comment: transaction.comment.clone(),
        }
    }

    fn sort_key(&self) -> (DateTime<Utc>, TransactionId, FlowId) {
        (self.occurred_at, self.transaction_id, self.flow.id)
    }
}

/// Scalar accumulator over joined flows.
#[derive(Debug, Clone)]
pub struct DebtAccumulator {
    polarity: DebtPolarity,
    total: i64,
}

impl DebtAccumulator {
    pub fn new(polarity: DebtPolarity) -> Self {
        Self { polarity, total: 0 }
    }

    pub fn total(&self) -> i64 {
        self.total
    }
}

impl Projection for DebtAccumulator {
    type Ev = JoinedFlow;
    type Output = DomainResult<DebtPoint>;

    fn apply(&mut self, event: &JoinedFlow) -> DomainResult<DebtPoint> {
        let delta = self.polarity.effect(&event.flow)?;
        self.total = checked_sum(self.total, delta)?;
        Ok(DebtPoint {
            flow_id: event.flow.id,
            transaction_id: event.transaction_id,
            occurred_at: event.occurred_at,
            counterparty: event.flow.agent.clone(),
            comment: event.comment.clone(),
            amount: event.flow.amount,
            is_debt: event.flow.is_debt,
            delta,
            total: self.total,
        })
    }
}

/// One flow applied to the floating debt aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtPoint {
    pub flow_id: FlowId,
    pub transaction_id: TransactionId,
    /// Timestamp of the owning transaction.
    pub occurred_at: DateTime<Utc>,
    pub counterparty: Counterparty,
    pub comment: String,
    pub amount: u64,
    pub is_debt: bool,
    pub delta: i64,
    /// Aggregate right after this flow.
    pub total: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DebtTracker {
    polarity: DebtPolarity,
}

impl DebtTracker {
    pub fn new(polarity: DebtPolarity) -> Self {
        Self { polarity }
    }

    pub fn polarity(&self) -> DebtPolarity {
        self.polarity
    }

    /// Replay every floating flow of `currency_id`.
    ///
    /// Flows of account-owned transactions and of transactions in other
    /// currencies are skipped. A flow whose transaction is not supplied is
    /// a reference mismatch.
    pub fn track(
        &self,
        currency_id: CurrencyId,
        transactions: &[Transaction],
        flows: &[Flow],
    ) -> DomainResult<DebtTimeline> {
        let by_id = index_by_id("transaction", transactions)?;
        index_by_id("flow", flows)?;

        let mut joined = Vec::new();
        for flow in flows {
            let transaction = by_id.get(&flow.transaction_id).copied().ok_or_else(|| {
                DomainError::reference_mismatch(format!(
                    "flow {} references unknown transaction {}",
                    flow.id, flow.transaction_id
                ))
            })?;
            if !transaction.is_remote() || transaction.currency_id != currency_id {
                continue;
            }
            joined.push(JoinedFlow::new(flow, transaction));
        }

        joined.sort_by_key(JoinedFlow::sort_key);

        let mut accumulator = DebtAccumulator::new(self.polarity);
        let points = try_replay(&mut accumulator, &joined)?;

        debug!(
            currency_id = %currency_id,
            flows = flows.len(),
            floating = points.len(),
            total = accumulator.total(),
            "replayed floating debt"
        );

        Ok(DebtTimeline {
            currency_id,
            points,
        })
    }
}

/// Row filter over a debt timeline. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowFilter {
    pub counterparty: Option<AgentId>,
    pub min_amount: Option<u64>,
    pub max_amount: Option<u64>,
    pub range: DateRange,
    pub search: Option<String>,
}

impl FlowFilter {
    pub fn matches(&self, point: &DebtPoint) -> bool {
        self.counterparty.is_none_or(|id| point.counterparty.id == id)
            && self.min_amount.is_none_or(|min| point.amount >= min)
            && self.max_amount.is_none_or(|max| point.amount <= max)
            && self.range.contains(point.occurred_at)
            && matches_search(
                self.search.as_deref(),
                &[&point.counterparty.name, &point.comment],
            )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPage {
    pub pages: u64,
    pub flows: Vec<DebtPoint>,
}

/// Floating debt history of one currency, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtTimeline {
    pub currency_id: CurrencyId,
    points: Vec<DebtPoint>,
}

impl DebtTimeline {
    pub fn points(&self) -> &[DebtPoint] {
        &self.points
    }

    pub fn total(&self) -> i64 {
        self.points.last().map_or(0, |p| p.total)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points kept by `filter`, totals untouched.
    pub fn filter(&self, filter: &FlowFilter) -> Vec<DebtPoint> {
        self.points
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect()
    }

    /// Filtered points, newest first, one page at a time.
    pub fn page(&self, filter: &FlowFilter, pagination: Pagination) -> FlowPage {
        let mut rows = self.filter(filter);
        rows.reverse();
        FlowPage {
            pages: pagination.page_count(rows.len()),
            flows: pagination.slice(&rows).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use finledger_core::AccountId;
    use proptest::prelude::*;

    fn day(d: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::days(d)
    }

    fn agent(id: u64, name: &str) -> Counterparty {
        Counterparty {
            id: AgentId::new(id),
            name: name.to_string(),
        }
    }

    fn remote_tx(id: u64, at: i64, currency: u64) -> Transaction {
        Transaction {
            id: TransactionId::new(id),
            occurred_at: day(at),
            amount: 0,
            is_expense: true,
            account_id: None,
            currency_id: CurrencyId::new(currency),
            agent: agent(1, "Dinner club"),
            comment: format!("dinner {id}"),
            records: vec![],
        }
    }

    fn flow(id: u64, tx: u64, amount: u64, is_debt: bool, who: Counterparty) -> Flow {
        Flow {
            id: FlowId::new(id),
            transaction_id: TransactionId::new(tx),
            amount,
            is_debt,
            agent: who,
        }
    }

    fn eur() -> CurrencyId {
        CurrencyId::new(1)
    }

    #[test]
    fn accumulates_in_transaction_order() {
        let txs = [remote_tx(2, 5, 1), remote_tx(1, 1, 1)];
        let flows = [
            flow(3, 2, 400, false, agent(2, "Alice")),
            flow(1, 1, 1_000, true, agent(2, "Alice")),
            flow(2, 1, 250, false, agent(3, "Bob")),
        ];
        let timeline = DebtTracker::default().track(eur(), &txs, &flows).unwrap();
        let totals: Vec<_> = timeline.points().iter().map(|p| p.total).collect();
        assert_eq!(totals, vec![-1_000, -750, -350]);
        assert_eq!(timeline.total(), -350);
    }

    #[test]
    fn inverted_polarity_flips_signs() {
        let txs = [remote_tx(1, 1, 1)];
        let flows = [flow(1, 1, 1_000, true, agent(2, "Alice"))];
        let timeline = DebtTracker::new(DebtPolarity::DebtIncreasesNetPosition)
            .track(eur(), &txs, &flows)
            .unwrap();
        assert_eq!(timeline.total(), 1_000);
    }

    #[test]
    fn skips_account_owned_and_foreign_currency_flows() {
        let mut owned = remote_tx(2, 2, 1);
        owned.account_id = Some(AccountId::new(9));
        let txs = [remote_tx(1, 1, 1), owned, remote_tx(3, 3, 2)];
        let flows = [
            flow(1, 1, 10, true, agent(2, "Alice")),
            flow(2, 2, 20, true, agent(2, "Alice")),
            flow(3, 3, 30, true, agent(2, "Alice")),
        ];
        let timeline = DebtTracker::default().track(eur(), &txs, &flows).unwrap();
        assert_eq!(timeline.points().len(), 1);
        assert_eq!(timeline.total(), -10);
    }

    #[test]
    fn unknown_transaction_is_a_reference_mismatch() {
        let flows = [flow(1, 42, 10, true, agent(2, "Alice"))];
        let err = DebtTracker::default().track(eur(), &[], &flows).unwrap_err();
        assert!(matches!(err, DomainError::ReferenceMismatch(_)));
    }

    #[test]
    fn aggregate_leaving_the_i64_range_is_inconsistent() {
        let txs = [remote_tx(1, 1, 1), remote_tx(2, 2, 1)];
        let flows = [
            flow(1, 1, i64::MAX as u64, false, agent(2, "Alice")),
            flow(2, 2, 1, false, agent(2, "Alice")),
        ];
        let err = DebtTracker::default().track(eur(), &txs, &flows).unwrap_err();
        assert!(matches!(err, DomainError::InconsistentSnapshot(_)));

        let flows = [flow(1, 1, u64::MAX, true, agent(2, "Alice"))];
        let err = DebtTracker::default().track(eur(), &txs, &flows).unwrap_err();
        assert!(matches!(err, DomainError::InconsistentSnapshot(_)));
    }

    #[test]
    fn empty_input_is_an_empty_timeline() {
        let timeline = DebtTracker::default().track(eur(), &[], &[]).unwrap();
        assert!(timeline.is_empty());
        assert_eq!(timeline.total(), 0);
    }

    #[test]
    fn filter_keeps_running_totals() {
        let txs = [remote_tx(1, 1, 1), remote_tx(2, 2, 1), remote_tx(3, 3, 1)];
        let flows = [
            flow(1, 1, 100, true, agent(2, "Alice")),
            flow(2, 2, 50, false, agent(3, "Bob")),
            flow(3, 3, 30, true, agent(2, "Alice")),
        ];
        let timeline = DebtTracker::default().track(eur(), &txs, &flows).unwrap();

        let alice = FlowFilter {
            counterparty: Some(AgentId::new(2)),
            ..FlowFilter::default()
        };
        let totals: Vec<_> = timeline.filter(&alice).iter().map(|p| p.total).collect();
        assert_eq!(totals, vec![-100, -80]);

        let large = FlowFilter {
            min_amount: Some(40),
            max_amount: Some(60),
            ..FlowFilter::default()
        };
        assert_eq!(timeline.filter(&large)[0].flow_id, FlowId::new(2));

        let search = FlowFilter {
            search: Some("DINNER 3".to_string()),
            ..FlowFilter::default()
        };
        assert_eq!(timeline.filter(&search).len(), 1);

        let page = timeline.page(&FlowFilter::default(), Pagination::new(0, 2).unwrap());
        assert_eq!(page.pages, 2);
        let ids: Vec<_> = page.flows.iter().map(|p| p.flow_id.get()).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// The aggregate equals the signed sum of all floating flows, whatever
        /// order they are supplied in.
        #[test]
        fn total_is_order_independent(
            specs in prop::collection::vec((0i64..20, 0u64..10_000, any::<bool>()), 0..30),
        ) {
            let txs: Vec<_> = specs
                .iter()
                .enumerate()
                .map(|(i, (at, _, _))| remote_tx(i as u64 + 1, *at, 1))
                .collect();
            let flows: Vec<_> = specs
                .iter()
                .enumerate()
                .map(|(i, (_, amount, is_debt))| {
                    flow(i as u64 + 1, i as u64 + 1, *amount, *is_debt, agent(2, "Alice"))
                })
                .collect();

            let forward = DebtTracker::default().track(eur(), &txs, &flows).unwrap();
            let mut reversed = flows.clone();
            reversed.reverse();
            let backward = DebtTracker::default().track(eur(), &txs, &reversed).unwrap();
            prop_assert_eq!(&forward, &backward);

            let expected: i128 = specs
                .iter()
                .map(|(_, amount, is_debt)| if *is_debt { -(*amount as i128) } else { *amount as i128 })
                .sum();
            prop_assert_eq!(forward.total() as i128, expected);
        }
    }
}
