use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use finledger_accounting::{Account, Currency};
use finledger_core::{AccountId, CurrencyId};
use finledger_events::{Flow, Transaction, Transfer};

use super::r#trait::{AccountEvents, CurrencyEvents, EventSource, SourceError};
use super::snapshot::Snapshot;

/// Mutable in-memory event source.
///
/// Intended for tests/dev. Every read clones the scoped events out of the lock.
#[derive(Debug, Default)]
pub struct InMemoryEventSource {
    state: RwLock<Snapshot>,
}

impl InMemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Snapshot>, SourceError> {
        self.state.read().map_err(|_| SourceError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Snapshot>, SourceError> {
        self.state.write().map_err(|_| SourceError::Poisoned)
    }

    pub fn insert_currency(&self, currency: Currency) -> Result<(), SourceError> {
        self.write()?.currencies.push(currency);
        Ok(())
    }

    pub fn insert_account(&self, account: Account) -> Result<(), SourceError> {
        self.write()?.accounts.push(account);
        Ok(())
    }

    pub fn insert_transaction(&self, transaction: Transaction) -> Result<(), SourceError> {
        self.write()?.transactions.push(transaction);
        Ok(())
    }

    pub fn insert_transfer(&self, transfer: Transfer) -> Result<(), SourceError> {
        self.write()?.transfers.push(transfer);
        Ok(())
    }

    pub fn insert_flow(&self, flow: Flow) -> Result<(), SourceError> {
        self.write()?.flows.push(flow);
        Ok(())
    }

    /// Copy of everything stored so far.
    pub fn snapshot(&self) -> Result<Snapshot, SourceError> {
        Ok(self.read()?.clone())
    }
}

impl EventSource for InMemoryEventSource {
    fn account_events(&self, account_id: AccountId) -> Result<AccountEvents, SourceError> {
        self.read()?.account_events(account_id)
    }

    fn currency_events(&self, currency_id: CurrencyId) -> Result<CurrencyEvents, SourceError> {
        self.read()?.currency_events(currency_id)
    }

    fn currencies(&self) -> Result<Vec<Currency>, SourceError> {
        Ok(self.read()?.currencies.clone())
    }
}
