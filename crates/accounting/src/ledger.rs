//! Single-account balance reconstruction.
//!
//! The ledger stores no balance. Every view is a full replay of the account's
//! transactions and transfers, seeded with its opening balance.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use finledger_core::{AccountId, DomainError, DomainResult, checked_sum};
use finledger_events::{
    AccountChange, ChangeKind, Event, Projection, Transaction, Transfer, try_replay,
};

use crate::account::Account;
use crate::query::{ChangeQuery, matches_search};

/// A change together with its effect and the balance right after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub change: AccountChange,
    pub signed_amount: i64,
    pub running_balance: i64,
}

/// Accumulator threaded through a single-account replay.
#[derive(Debug, Clone)]
pub struct RunningBalance {
    account_id: AccountId,
    balance: i64,
}

impl RunningBalance {
    pub fn new(account_id: AccountId, opening: i64) -> Self {
        Self {
            account_id,
            balance: opening,
        }
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }
}

impl Projection for RunningBalance {
    type Ev = AccountChange;
    /// `(signed effect, balance after)`.
    type Output = DomainResult<(i64, i64)>;

    fn apply(&mut self, event: &AccountChange) -> DomainResult<(i64, i64)> {
        let delta = event.effect_for(self.account_id)?.unwrap_or(0);
        self.balance = checked_sum(self.balance, delta)?;
        Ok((delta, self.balance))
    }
}

/// Replay the full history of `account`.
///
/// Every transaction must be owned by the account and every transfer must
/// touch it. The result does not depend on the order of the inputs.
pub fn reconstruct(
    account: &Account,
    transactions: &[Transaction],
    transfers: &[Transfer],
) -> DomainResult<AccountLedger> {
    let mut changes: Vec<AccountChange> = Vec::with_capacity(transactions.len() + transfers.len());

    for tx in transactions {
        if tx.account_id != Some(account.id) {
            return Err(DomainError::reference_mismatch(format!(
                "transaction {} does not belong to account {}",
                tx.id, account.id
            )));
        }
        changes.push(tx.clone().into());
    }

    for transfer in transfers {
        transfer.validate()?;
        if !transfer.touches(account.id) {
            return Err(DomainError::reference_mismatch(format!(
                "transfer {} does not touch account {}",
                transfer.id, account.id
            )));
        }
        changes.push(transfer.clone().into());
    }

    let mut seen = BTreeSet::new();
    for change in &changes {
        if !seen.insert((change.kind(), change.raw_id())) {
            return Err(DomainError::inconsistent(format!(
                "{:?} {} appears more than once",
                change.kind(),
                change.raw_id()
            )));
        }
    }

    changes.sort_by_key(|change| change.sort_key(account.id));

    let mut balance = RunningBalance::new(account.id, account.starting_saldo);
    let outputs = try_replay(&mut balance, &changes)?;
    let entries: Vec<LedgerEntry> = changes
        .into_iter()
        .zip(outputs)
        .map(|(change, (signed_amount, running_balance))| LedgerEntry {
            change,
            signed_amount,
            running_balance,
        })
        .collect();

    debug!(
        account_id = %account.id,
        transactions = transactions.len(),
        transfers = transfers.len(),
        balance = balance.balance(),
        "replayed account history"
    );

    Ok(AccountLedger {
        account_id: account.id,
        starting_saldo: account.starting_saldo,
        date_created: account.date_created,
        entries,
    })
}

/// Chronological balance history of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountLedger {
    account_id: AccountId,
    starting_saldo: i64,
    date_created: DateTime<Utc>,
    entries: Vec<LedgerEntry>,
}

impl AccountLedger {
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn starting_saldo(&self) -> i64 {
        self.starting_saldo
    }

    pub fn date_created(&self) -> DateTime<Utc> {
        self.date_created
    }

    /// Entries oldest first.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_balance(&self) -> i64 {
        self.entries
            .last()
            .map_or(self.starting_saldo, |e| e.running_balance)
    }

    /// The `n` most recent entries, oldest first, with balances taken from the
    /// full replay.
    pub fn last(&self, n: usize) -> &[LedgerEntry] {
        let from = self.entries.len().saturating_sub(n);
        &self.entries[from..]
    }

    /// `[starting_saldo, b1, .., bn]`.
    pub fn saldo_sequence(&self) -> Vec<i64> {
        std::iter::once(self.starting_saldo)
            .chain(self.entries.iter().map(|e| e.running_balance))
            .collect()
    }

    /// Rows for display, newest first.
    ///
    /// `peers` resolves the other side of transfers to an account name.
    /// Filtering happens after the replay, so balances are never affected.
    pub fn page(
        &self,
        query: &ChangeQuery,
        peers: &BTreeMap<AccountId, String>,
    ) -> DomainResult<ChangePage> {
        let mut rows = Vec::new();
        for entry in self.entries.iter().rev() {
            if !query.range.contains(entry.change.occurred_at()) {
                continue;
            }
            let row = self.row(entry, peers)?;
            if matches_search(query.search.as_deref(), &[&row.target, &row.comment]) {
                rows.push(row);
            }
        }

        let pages = query.pagination.page_count(rows.len());
        let changes = query.pagination.slice(&rows).to_vec();
        Ok(ChangePage { pages, changes })
    }

    fn row(
        &self,
        entry: &LedgerEntry,
        peers: &BTreeMap<AccountId, String>,
    ) -> DomainResult<ChangeRow> {
        let target = match &entry.change {
            AccountChange::Transaction(tx) => tx.agent.name.clone(),
            AccountChange::Transfer(transfer) => {
                let peer = transfer.peer_of(self.account_id).ok_or_else(|| {
                    DomainError::reference_mismatch(format!(
                        "transfer {} does not touch account {}",
                        transfer.id, self.account_id
                    ))
                })?;
                peers.get(&peer).cloned().ok_or_else(|| {
                    DomainError::reference_mismatch(format!(
                        "transfer {} references unknown account {peer}",
                        transfer.id
                    ))
                })?
            }
        };

        Ok(ChangeRow {
            event_id: entry.change.raw_id(),
            event_kind: entry.change.kind(),
            occurred_at: entry.change.occurred_at(),
            target,
            signed_amount: entry.signed_amount,
            running_balance: entry.running_balance,
            comment: entry.change.comment().to_string(),
        })
    }
}

/// Flattened change, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRow {
    pub event_id: u64,
    pub event_kind: ChangeKind,
    pub occurred_at: DateTime<Utc>,
    /// Counterparty name for transactions, peer account name for transfers.
    pub target: String,
    pub signed_amount: i64,
    pub running_balance: i64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePage {
    pub pages: u64,
    pub changes: Vec<ChangeRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{DateRange, Pagination};
    use chrono::{Duration, TimeZone};
    use finledger_core::{AgentId, CurrencyId, TransactionId, TransferId};
    use finledger_events::Counterparty;
    use proptest::prelude::*;

    fn day(d: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::days(d)
    }

    fn account(id: u64, starting_saldo: i64) -> Account {
        Account {
            id: AccountId::new(id),
            name: format!("account {id}"),
            color: "#112233".to_string(),
            currency_id: CurrencyId::new(1),
            starting_saldo,
            date_created: day(0),
            order: 0,
        }
    }

    fn tx(id: u64, at: i64, amount: u64, is_expense: bool, comment: &str) -> Transaction {
        Transaction {
            id: TransactionId::new(id),
            occurred_at: day(at),
            amount,
            is_expense,
            account_id: Some(AccountId::new(1)),
            currency_id: CurrencyId::new(1),
            agent: Counterparty {
                id: AgentId::new(7),
                name: "Corner Shop".to_string(),
            },
            comment: comment.to_string(),
            records: vec![],
        }
    }

    fn transfer(id: u64, at: i64, src: u64, dst: u64, amount: u64) -> Transfer {
        Transfer {
            id: TransferId::new(id),
            occurred_at: day(at),
            src_id: AccountId::new(src),
            dst_id: AccountId::new(dst),
            src_amount: amount,
            dst_amount: amount,
            comment: String::new(),
        }
    }

    fn peers() -> BTreeMap<AccountId, String> {
        BTreeMap::from([(AccountId::new(2), "Savings".to_string())])
    }

    #[test]
    fn worked_example_balances() {
        let ledger = reconstruct(
            &account(1, 10_000),
            &[tx(1, 4, 3_000, true, "")],
            &[transfer(1, 9, 2, 1, 5_000)],
        )
        .unwrap();
        assert_eq!(ledger.saldo_sequence(), vec![10_000, 7_000, 12_000]);
        assert_eq!(ledger.current_balance(), 12_000);
        let last = &ledger.entries()[1];
        assert_eq!(last.change.occurred_at(), Utc.with_ymd_and_hms(2023, 1, 10, 0, 0, 0).unwrap());
        assert_eq!(last.running_balance, 12_000);
    }

    #[test]
    fn account_without_events_keeps_opening_balance() {
        let ledger = reconstruct(&account(1, 2_500), &[], &[]).unwrap();
        assert_eq!(ledger.saldo_sequence(), vec![2_500]);
        assert_eq!(ledger.current_balance(), 2_500);
        assert!(ledger.last(5).is_empty());
    }

    #[test]
    fn transfers_apply_per_side_amounts() {
        let mut outgoing = transfer(1, 2, 1, 2, 0);
        outgoing.src_amount = 400;
        outgoing.dst_amount = 380;
        let ledger = reconstruct(
            &account(1, 1_000),
            &[tx(1, 1, 100, false, "")],
            &[outgoing, transfer(2, 3, 2, 1, 50)],
        )
        .unwrap();
        assert_eq!(ledger.saldo_sequence(), vec![1_000, 1_100, 700, 750]);
    }

    #[test]
    fn same_instant_orders_transactions_before_transfers() {
        let ledger = reconstruct(
            &account(1, 0),
            &[tx(9, 1, 10, false, "")],
            &[transfer(1, 1, 2, 1, 5)],
        )
        .unwrap();
        let kinds: Vec<_> = ledger.entries().iter().map(|e| e.change.kind()).collect();
        assert_eq!(kinds, vec![ChangeKind::Transaction, ChangeKind::Transfer]);
    }

    #[test]
    fn same_instant_orders_outgoing_before_incoming_transfers() {
        let ledger = reconstruct(
            &account(1, 100),
            &[],
            &[transfer(1, 1, 2, 1, 30), transfer(2, 1, 1, 2, 50)],
        )
        .unwrap();
        let ids: Vec<_> = ledger.entries().iter().map(|e| e.change.raw_id()).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(ledger.saldo_sequence(), vec![100, 50, 80]);
    }

    #[test]
    fn foreign_transaction_is_rejected() {
        let mut foreign = tx(1, 1, 10, true, "");
        foreign.account_id = Some(AccountId::new(3));
        let err = reconstruct(&account(1, 0), &[foreign], &[]).unwrap_err();
        assert!(matches!(err, DomainError::ReferenceMismatch(_)));

        let mut remote = tx(2, 1, 10, true, "");
        remote.account_id = None;
        let err = reconstruct(&account(1, 0), &[remote], &[]).unwrap_err();
        assert!(matches!(err, DomainError::ReferenceMismatch(_)));
    }

    #[test]
    fn unrelated_transfer_is_rejected() {
        let err = reconstruct(&account(1, 0), &[], &[transfer(1, 1, 2, 3, 10)]).unwrap_err();
        assert!(matches!(err, DomainError::ReferenceMismatch(_)));
    }

    #[test]
    fn self_transfer_is_inconsistent() {
        let err = reconstruct(&account(1, 0), &[], &[transfer(1, 1, 1, 1, 10)]).unwrap_err();
        assert!(matches!(err, DomainError::InconsistentSnapshot(_)));
    }

    #[test]
    fn duplicate_transaction_is_inconsistent() {
        let err = reconstruct(
            &account(1, 0),
            &[tx(1, 1, 10, true, ""), tx(1, 2, 10, true, "")],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InconsistentSnapshot(_)));
    }

    #[test]
    fn balance_leaving_the_i64_range_is_inconsistent() {
        let err = reconstruct(
            &account(1, i64::MAX - 10),
            &[tx(1, 1, 100, false, ""), tx(2, 2, 100, true, "")],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InconsistentSnapshot(_)));

        let err = reconstruct(&account(1, 0), &[tx(1, 1, u64::MAX, true, "")], &[]).unwrap_err();
        assert!(matches!(err, DomainError::InconsistentSnapshot(_)));
    }

    #[test]
    fn page_lists_newest_first_with_targets() {
        let ledger = reconstruct(
            &account(1, 0),
            &[tx(1, 1, 100, false, "salary"), tx(2, 2, 30, true, "Groceries")],
            &[transfer(1, 3, 1, 2, 20)],
        )
        .unwrap();

        let page = ledger.page(&ChangeQuery::default(), &peers()).unwrap();
        assert_eq!(page.pages, 1);
        let targets: Vec<_> = page.changes.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["Savings", "Corner Shop", "Corner Shop"]);
        let balances: Vec<_> = page.changes.iter().map(|r| r.running_balance).collect();
        assert_eq!(balances, vec![50, 70, 100]);
    }

    #[test]
    fn filters_do_not_change_balances() {
        let ledger = reconstruct(
            &account(1, 0),
            &[
                tx(1, 1, 100, false, "salary"),
                tx(2, 2, 30, true, "Groceries"),
                tx(3, 4, 10, true, "groceries again"),
            ],
            &[],
        )
        .unwrap();

        let query = ChangeQuery {
            range: DateRange::new(Some(day(2)), Some(day(4))).unwrap(),
            search: None,
            pagination: Pagination::default(),
        };
        let page = ledger.page(&query, &peers()).unwrap();
        assert_eq!(page.changes.len(), 1);
        assert_eq!(page.changes[0].running_balance, 70);

        let query = ChangeQuery {
            search: Some("GROCERIES".to_string()),
            ..ChangeQuery::default()
        };
        let page = ledger.page(&query, &peers()).unwrap();
        let balances: Vec<_> = page.changes.iter().map(|r| r.running_balance).collect();
        assert_eq!(balances, vec![60, 70]);
    }

    #[test]
    fn page_fails_for_unknown_peer() {
        let ledger = reconstruct(&account(1, 0), &[], &[transfer(1, 1, 1, 5, 10)]).unwrap();
        let err = ledger.page(&ChangeQuery::default(), &peers()).unwrap_err();
        assert!(matches!(err, DomainError::ReferenceMismatch(_)));
    }

    #[test]
    fn pagination_counts_filtered_rows() {
        let txs: Vec<_> = (1..=25).map(|i| tx(i, i as i64, 1, false, "")).collect();
        let ledger = reconstruct(&account(1, 0), &txs, &[]).unwrap();
        let query = ChangeQuery {
            pagination: Pagination::new(2, 10).unwrap(),
            ..ChangeQuery::default()
        };
        let page = ledger.page(&query, &peers()).unwrap();
        assert_eq!(page.pages, 3);
        let ids: Vec<_> = page.changes.iter().map(|r| r.event_id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    }

    fn arb_history() -> impl Strategy<Value = (Vec<Transaction>, Vec<Transfer>)> {
        let txs = prop::collection::vec((0i64..30, 0u64..100_000, any::<bool>()), 0..40);
        let transfers = prop::collection::vec((0i64..30, 0u64..100_000, any::<bool>()), 0..20);
        (txs, transfers).prop_map(|(txs, transfers)| {
            let txs = txs
                .into_iter()
                .enumerate()
                .map(|(i, (at, amount, is_expense))| tx(i as u64 + 1, at, amount, is_expense, ""))
                .collect();
            let transfers = transfers
                .into_iter()
                .enumerate()
                .map(|(i, (at, amount, outgoing))| {
                    let (src, dst) = if outgoing { (1, 2) } else { (2, 1) };
                    transfer(i as u64 + 1, at, src, dst, amount)
                })
                .collect();
            (txs, transfers)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// The final balance equals the opening balance plus every signed effect.
        #[test]
        fn balance_closure(
            starting in -1_000_000i64..1_000_000,
            (txs, transfers) in arb_history(),
        ) {
            let ledger = reconstruct(&account(1, starting), &txs, &transfers).unwrap();
            let mut expected = starting as i128;
            for t in &txs {
                expected += t.signed_amount().unwrap() as i128;
            }
            for t in &transfers {
                expected += t.effect_for(AccountId::new(1)).unwrap().unwrap() as i128;
            }
            prop_assert_eq!(ledger.current_balance() as i128, expected);
        }

        /// A suffix view reports the same balances as the full history.
        #[test]
        fn suffix_stability(
            (txs, transfers) in arb_history(),
            n in 0usize..50,
        ) {
            let ledger = reconstruct(&account(1, 500), &txs, &transfers).unwrap();
            let suffix = ledger.last(n);
            let offset = ledger.len() - suffix.len();
            prop_assert_eq!(suffix, &ledger.entries()[offset..]);
            prop_assert!(suffix.len() <= n);
        }

        /// Input order never changes the result.
        #[test]
        fn determinism_under_reordering((txs, transfers) in arb_history()) {
            let forward = reconstruct(&account(1, 0), &txs, &transfers).unwrap();
            let mut txs_rev = txs.clone();
            txs_rev.reverse();
            let mut transfers_rev = transfers.clone();
            transfers_rev.reverse();
            let backward = reconstruct(&account(1, 0), &txs_rev, &transfers_rev).unwrap();
            prop_assert_eq!(forward, backward);
        }

        /// Filtering rows twice is the same as filtering once; balances are untouched.
        #[test]
        fn filter_idempotence((txs, transfers) in arb_history(), lo in 0i64..30, span in 0i64..30) {
            let ledger = reconstruct(&account(1, 0), &txs, &transfers).unwrap();
            let query = ChangeQuery {
                range: DateRange::new(Some(day(lo)), Some(day(lo + span))).unwrap(),
                search: None,
                pagination: Pagination::new(0, 1_000).unwrap(),
            };
            let page = ledger.page(&query, &peers()).unwrap();
            for row in &page.changes {
                let entry = ledger
                    .entries()
                    .iter()
                    .find(|e| e.change.kind() == row.event_kind && e.change.raw_id() == row.event_id)
                    .unwrap();
                prop_assert_eq!(entry.running_balance, row.running_balance);
                prop_assert!(query.range.contains(row.occurred_at));
            }
            let again = ledger.page(&query, &peers()).unwrap();
            prop_assert_eq!(page, again);
        }
    }
}
