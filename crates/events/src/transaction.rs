use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finledger_core::{
    AccountId, AgentId, CategoryId, CurrencyId, DomainResult, Entity, TransactionId, signed_effect,
};

use crate::Event;

/// The other party of a transaction or flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: AgentId,
    pub name: String,
}

/// Share of a transaction booked against one category.
///
/// Splits are carried for category reporting only; their sum is not checked
/// against the transaction amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySplit {
    pub category_id: CategoryId,
    /// Unsigned amount in minor units.
    pub amount: u64,
}

/// Direct transaction against one account, or a "remote" transaction that is
/// owned by no account and only moves debt to or from a counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub occurred_at: DateTime<Utc>,
    /// Unsigned amount in minor units.
    pub amount: u64,
    pub is_expense: bool,
    /// `None` marks a remote transaction.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    pub currency_id: CurrencyId,
    pub agent: Counterparty,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub records: Vec<CategorySplit>,
}

impl Transaction {
    pub fn is_remote(&self) -> bool {
        self.account_id.is_none()
    }

    /// Effect on the owning account: `-amount` for expenses, `+amount` otherwise.
    pub fn signed_amount(&self) -> DomainResult<i64> {
        signed_effect(self.amount, self.is_expense)
    }
}

impl Event for Transaction {
    fn event_type(&self) -> &'static str {
        if self.is_remote() {
            "ledger.remote_transaction"
        } else {
            "ledger.transaction"
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> TransactionId {
        self.id
    }
}
