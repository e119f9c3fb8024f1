use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use finledger_accounting::{Account, Currency, NetWorthInput};
use finledger_core::{AccountId, CurrencyId, DomainError};
use finledger_events::{Flow, Transaction, Transfer};

/// Error raised while reading events out of a source.
///
/// Domain errors pass through unchanged so callers can still tell a missing
/// account from a malformed snapshot.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("snapshot could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot could not be decoded: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("event source lock poisoned")]
    Poisoned,
}

/// Everything recorded against one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEvents {
    pub account: Account,
    /// Transactions owned by the account.
    pub transactions: Vec<Transaction>,
    /// Transfers with the account on either side.
    pub transfers: Vec<Transfer>,
    /// Names of the accounts on the other side of `transfers`.
    pub peers: BTreeMap<AccountId, String>,
}

impl AccountEvents {
    /// Number of events that reference the account.
    pub fn dependency_count(&self) -> usize {
        self.transactions.len() + self.transfers.len()
    }
}

/// Everything recorded for one currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyEvents {
    pub currency: Currency,
    pub accounts: Vec<Account>,
    /// Account-owned and remote transactions in the currency.
    pub transactions: Vec<Transaction>,
    /// Transfers touching at least one account of the currency.
    pub transfers: Vec<Transfer>,
    /// Flows of `transactions`.
    pub flows: Vec<Flow>,
}

impl CurrencyEvents {
    pub fn as_input(&self) -> NetWorthInput<'_> {
        NetWorthInput {
            currency_id: self.currency.id,
            accounts: &self.accounts,
            transactions: &self.transactions,
            transfers: &self.transfers,
            flows: &self.flows,
        }
    }
}

/// Read-only access to recorded events.
///
/// Implementations return unordered collections scoped to an account or a
/// currency; ordering is the replay's job. Unknown ids are
/// `DomainError::NotFound`.
pub trait EventSource: Send + Sync {
    fn account_events(&self, account_id: AccountId) -> Result<AccountEvents, SourceError>;

    fn currency_events(&self, currency_id: CurrencyId) -> Result<CurrencyEvents, SourceError>;

    fn currencies(&self) -> Result<Vec<Currency>, SourceError>;
}

impl<S> EventSource for Arc<S>
where
    S: EventSource + ?Sized,
{
    fn account_events(&self, account_id: AccountId) -> Result<AccountEvents, SourceError> {
        (**self).account_events(account_id)
    }

    fn currency_events(&self, currency_id: CurrencyId) -> Result<CurrencyEvents, SourceError> {
        (**self).currency_events(currency_id)
    }

    fn currencies(&self) -> Result<Vec<Currency>, SourceError> {
        (**self).currencies()
    }
}
