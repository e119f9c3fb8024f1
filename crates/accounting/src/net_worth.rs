//! Stacked net-worth timeline over every account of one currency.
//!
//! Accounts are stacked in display order: each emitted point is the account's
//! own balance plus the balances of all started accounts ranked below it. The
//! floating debt series sits on top of the whole stack.
//!
//! The replay is a merge over four sorted streams (account activations,
//! transfers, driver transactions, debt points), each walked by a cursor that
//! only moves forward.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use finledger_core::{
    AccountId, CurrencyId, DomainError, DomainResult, checked_sum, index_by_id, signed_effect,
};
use finledger_events::{Flow, Transaction, Transfer};

use crate::account::Account;
use crate::debt::{DebtPoint, DebtPolarity, DebtTracker};
use crate::series::Point;

pub const DEFAULT_DEBT_SERIES_NAME: &str = "floating debt";
pub const DEFAULT_DEBT_SERIES_COLOR: &str = "#555555";

/// Everything recorded for one currency.
#[derive(Debug, Clone, Copy)]
pub struct NetWorthInput<'a> {
    pub currency_id: CurrencyId,
    pub accounts: &'a [Account],
    /// Account-owned and remote transactions of the currency.
    pub transactions: &'a [Transaction],
    pub transfers: &'a [Transfer],
    pub flows: &'a [Flow],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetWorthOptions {
    pub polarity: DebtPolarity,
    pub debt_name: String,
    pub debt_color: String,
}

impl Default for NetWorthOptions {
    fn default() -> Self {
        Self {
            polarity: DebtPolarity::default(),
            debt_name: DEFAULT_DEBT_SERIES_NAME.to_string(),
            debt_color: DEFAULT_DEBT_SERIES_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSeries {
    pub account_id: AccountId,
    pub name: String,
    pub color: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSeries {
    pub name: String,
    pub color: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetWorthTimeline {
    pub currency_id: CurrencyId,
    /// Bottom of the stack first.
    pub accounts: Vec<AccountSeries>,
    pub debt: DebtSeries,
}

#[derive(Debug, Clone, Default)]
pub struct NetWorthAggregator {
    options: NetWorthOptions,
}

impl NetWorthAggregator {
    pub fn new(options: NetWorthOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NetWorthOptions {
        &self.options
    }

    /// Build the stacked timeline, closing every series at `now`.
    ///
    /// Emission instants are clamped to `now`.
    pub fn aggregate(
        &self,
        input: NetWorthInput<'_>,
        now: DateTime<Utc>,
    ) -> DomainResult<NetWorthTimeline> {
        let currency_id = input.currency_id;

        index_by_id("account", input.accounts)?;
        let mut ranked: Vec<&Account> = input.accounts.iter().collect();
        for account in &ranked {
            if account.currency_id != currency_id {
                return Err(DomainError::reference_mismatch(format!(
                    "account {} is held in currency {}, not {currency_id}",
                    account.id, account.currency_id
                )));
            }
        }
        ranked.sort_by_key(|a| (a.order, a.id));
        let ranks: BTreeMap<AccountId, usize> = ranked
            .iter()
            .enumerate()
            .map(|(rank, a)| (a.id, rank))
            .collect();

        let mut drivers: Vec<(&Transaction, Option<usize>)> =
            Vec::with_capacity(input.transactions.len());
        for tx in input.transactions {
            if tx.currency_id != currency_id {
                return Err(DomainError::reference_mismatch(format!(
                    "transaction {} is in currency {}, not {currency_id}",
                    tx.id, tx.currency_id
                )));
            }
            let rank = match tx.account_id {
                None => None,
                Some(account_id) => Some(*ranks.get(&account_id).ok_or_else(|| {
                    DomainError::reference_mismatch(format!(
                        "transaction {} belongs to account {account_id} outside currency {currency_id}",
                        tx.id
                    ))
                })?),
            };
            drivers.push((tx, rank));
        }
        drivers.sort_by_key(|(tx, _)| (tx.occurred_at, tx.id));

        let mut transfers = Vec::with_capacity(input.transfers.len());
        for transfer in input.transfers {
            transfer.validate()?;
            let src = ranks.get(&transfer.src_id).copied();
            let dst = ranks.get(&transfer.dst_id).copied();
            if src.is_none() && dst.is_none() {
                continue;
            }
            transfers.push(StackTransfer {
                occurred_at: transfer.occurred_at,
                id: transfer.id.get(),
                src: src.map(|rank| (rank, transfer.src_amount)),
                dst: dst.map(|rank| (rank, transfer.dst_amount)),
            });
        }
        transfers.sort_by_key(|t| (t.occurred_at, t.id));

        let debt = DebtTracker::new(self.options.polarity).track(
            currency_id,
            input.transactions,
            input.flows,
        )?;

        let mut activations: Vec<Activation> = ranked
            .iter()
            .enumerate()
            .map(|(rank, a)| Activation {
                at: a.date_created,
                rank,
                starting_saldo: a.starting_saldo,
            })
            .collect();
        activations.sort_by_key(|a| (a.at, a.rank));

        let mut merge = Merge {
            stack: Stack::new(ranked.len()),
            now,
            activations,
            next_activation: 0,
            transfers,
            next_transfer: 0,
            debt: debt.points(),
            next_debt: 0,
        };

        for (tx, rank) in &drivers {
            let at = tx.occurred_at;
            merge.advance(Some(at))?;
            if let Some(rank) = rank {
                merge
                    .stack
                    .apply_transaction(*rank, tx.signed_amount()?, at.min(now))?;
            }
            merge.drain_debt(Some(at))?;
        }
        merge.advance(None)?;
        merge.drain_debt(None)?;

        let mut stack = merge.stack;
        stack.emit_from(0, now)?;
        stack.emit_debt(now)?;

        debug!(
            currency_id = %currency_id,
            accounts = ranked.len(),
            drivers = drivers.len(),
            debt = stack.debt,
            total = stack.total()?,
            "aggregated net worth"
        );

        let Stack {
            series,
            debt_points,
            ..
        } = stack;
        let accounts = ranked
            .iter()
            .zip(series)
            .map(|(a, points)| AccountSeries {
                account_id: a.id,
                name: a.name.clone(),
                color: a.color.clone(),
                points,
            })
            .collect();

        Ok(NetWorthTimeline {
            currency_id,
            accounts,
            debt: DebtSeries {
                name: self.options.debt_name.clone(),
                color: self.options.debt_color.clone(),
                points: debt_points,
            },
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Activation {
    at: DateTime<Utc>,
    rank: usize,
    starting_saldo: i64,
}

/// A transfer reduced to the sides inside the stack: `(rank, amount)`.
#[derive(Debug, Clone, Copy)]
struct StackTransfer {
    occurred_at: DateTime<Utc>,
    id: u64,
    src: Option<(usize, u64)>,
    dst: Option<(usize, u64)>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    started: bool,
    balance: i64,
}

/// Per-account balances in rank order plus the debt aggregate, and every
/// point emitted so far.
#[derive(Debug)]
struct Stack {
    slots: Vec<Slot>,
    debt: i64,
    series: Vec<Vec<Point>>,
    debt_points: Vec<Point>,
}

impl Stack {
    fn new(len: usize) -> Self {
        Self {
            slots: vec![Slot::default(); len],
            debt: 0,
            series: vec![Vec::new(); len],
            debt_points: Vec::new(),
        }
    }

    fn offset_below(&self, rank: usize) -> DomainResult<i64> {
        self.slots[..rank]
            .iter()
            .filter(|s| s.started)
            .try_fold(0i64, |acc, s| checked_sum(acc, s.balance))
    }

    fn total(&self) -> DomainResult<i64> {
        self.offset_below(self.slots.len())
    }

    /// Refresh every started account ranked at or above `rank`.
    fn emit_from(&mut self, rank: usize, at: DateTime<Utc>) -> DomainResult<()> {
        let mut offset = self.offset_below(rank)?;
        for (slot, points) in self.slots.iter().zip(self.series.iter_mut()).skip(rank) {
            if slot.started {
                offset = checked_sum(offset, slot.balance)?;
                points.push(Point::new(at, offset));
            }
        }
        Ok(())
    }

    fn emit_debt(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        let value = checked_sum(self.total()?, self.debt)?;
        self.debt_points.push(Point::new(at, value));
        Ok(())
    }

    /// Effects recorded before activation are kept on top of the opening balance.
    fn activate(&mut self, activation: Activation, at: DateTime<Utc>) -> DomainResult<()> {
        let rank = activation.rank;
        let below = self.offset_below(rank)?;
        self.series[rank].push(Point::new(at, below));

        let slot = &mut self.slots[rank];
        slot.started = true;
        slot.balance = checked_sum(slot.balance, activation.starting_saldo)?;
        let own = slot.balance;
        self.series[rank].push(Point::new(at, checked_sum(below, own)?));

        self.emit_from(rank + 1, at)?;
        self.emit_debt(at)
    }

    fn apply_transfer(&mut self, transfer: &StackTransfer, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some((rank, amount)) = transfer.src {
            self.adjust(rank, signed_effect(amount, true)?)?;
        }
        if let Some((rank, amount)) = transfer.dst {
            self.adjust(rank, signed_effect(amount, false)?)?;
        }
        self.emit_from(0, at)?;
        self.emit_debt(at)
    }

    /// Unstarted accounts only accumulate; nothing is drawn for them yet.
    fn apply_transaction(&mut self, rank: usize, delta: i64, at: DateTime<Utc>) -> DomainResult<()> {
        self.adjust(rank, delta)?;
        if self.slots[rank].started {
            self.emit_from(rank, at)?;
            self.emit_debt(at)?;
        }
        Ok(())
    }

    fn apply_debt(&mut self, point: &DebtPoint, at: DateTime<Utc>) -> DomainResult<()> {
        self.debt = point.total;
        self.emit_debt(at)
    }

    fn adjust(&mut self, rank: usize, delta: i64) -> DomainResult<()> {
        let slot = &mut self.slots[rank];
        slot.balance = checked_sum(slot.balance, delta)?;
        Ok(())
    }
}

/// Forward-only cursors over the sorted side streams.
struct Merge<'a> {
    stack: Stack,
    now: DateTime<Utc>,
    activations: Vec<Activation>,
    next_activation: usize,
    transfers: Vec<StackTransfer>,
    next_transfer: usize,
    debt: &'a [DebtPoint],
    next_debt: usize,
}

impl Merge<'_> {
    /// Apply activations at or before `until` and transfers strictly before it,
    /// interleaved by timestamp with activations first on ties. `None` drains
    /// both streams.
    fn advance(&mut self, until: Option<DateTime<Utc>>) -> DomainResult<()> {
        loop {
            let activation = self
                .activations
                .get(self.next_activation)
                .copied()
                .filter(|a| until.is_none_or(|t| a.at <= t));
            let transfer = self
                .transfers
                .get(self.next_transfer)
                .copied()
                .filter(|tr| until.is_none_or(|t| tr.occurred_at < t));

            match (activation, transfer) {
                (Some(a), Some(tr)) if a.at <= tr.occurred_at => self.activate(a)?,
                (Some(a), None) => self.activate(a)?,
                (_, Some(tr)) => {
                    self.next_transfer += 1;
                    self.stack.apply_transfer(&tr, tr.occurred_at.min(self.now))?;
                }
                (None, None) => return Ok(()),
            }
        }
    }

    fn activate(&mut self, activation: Activation) -> DomainResult<()> {
        self.next_activation += 1;
        self.stack.activate(activation, activation.at.min(self.now))
    }

    fn drain_debt(&mut self, until: Option<DateTime<Utc>>) -> DomainResult<()> {
        while let Some(point) = self.debt.get(self.next_debt) {
            if until.is_some_and(|t| point.occurred_at > t) {
                break;
            }
            self.next_debt += 1;
            self.stack.apply_debt(point, point.occurred_at.min(self.now))?;
        }
        Ok(())
    }
}
