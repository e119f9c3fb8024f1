//! The closed set of events that move an account balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finledger_core::{AccountId, DomainResult};

use crate::{Event, Transaction, Transfer};

/// Kind of an account change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Transaction,
    Transfer,
}

/// Place of a change among those sharing an instant in one account's history.
///
/// The declaration order is the tie-break rank: transactions first, then
/// transfers leaving the account, then transfers arriving in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeSlot {
    Transaction,
    OutgoingTransfer,
    IncomingTransfer,
}

/// Total order over the changes of one account: `(timestamp, slot, id)`.
pub type ChangeSortKey = (DateTime<Utc>, ChangeSlot, u64);

/// An event that changes the balance of at least one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountChange {
    Transaction(Transaction),
    Transfer(Transfer),
}

impl AccountChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            AccountChange::Transaction(_) => ChangeKind::Transaction,
            AccountChange::Transfer(_) => ChangeKind::Transfer,
        }
    }

    /// Raw identifier, unique within its kind.
    pub fn raw_id(&self) -> u64 {
        match self {
            AccountChange::Transaction(t) => t.id.get(),
            AccountChange::Transfer(t) => t.id.get(),
        }
    }

    pub fn comment(&self) -> &str {
        match self {
            AccountChange::Transaction(t) => &t.comment,
            AccountChange::Transfer(t) => &t.comment,
        }
    }

    /// Position of the change in the history of `account_id`.
    pub fn sort_key(&self, account_id: AccountId) -> ChangeSortKey {
        let slot = match self {
            AccountChange::Transaction(_) => ChangeSlot::Transaction,
            AccountChange::Transfer(t) if t.src_id == account_id => ChangeSlot::OutgoingTransfer,
            AccountChange::Transfer(_) => ChangeSlot::IncomingTransfer,
        };
        (self.occurred_at(), slot, self.raw_id())
    }

    /// Signed effect on `account_id`, or `None` when the change belongs elsewhere.
    pub fn effect_for(&self, account_id: AccountId) -> DomainResult<Option<i64>> {
        match self {
            AccountChange::Transaction(t) if t.account_id == Some(account_id) => {
                t.signed_amount().map(Some)
            }
            AccountChange::Transaction(_) => Ok(None),
            AccountChange::Transfer(t) => t.effect_for(account_id),
        }
    }
}

impl Event for AccountChange {
    fn event_type(&self) -> &'static str {
        match self {
            AccountChange::Transaction(t) => t.event_type(),
            AccountChange::Transfer(t) => t.event_type(),
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountChange::Transaction(t) => t.occurred_at,
            AccountChange::Transfer(t) => t.occurred_at,
        }
    }
}

impl From<Transaction> for AccountChange {
    fn from(value: Transaction) -> Self {
        AccountChange::Transaction(value)
    }
}

impl From<Transfer> for AccountChange {
    fn from(value: Transfer) -> Self {
        AccountChange::Transfer(value)
    }
}
