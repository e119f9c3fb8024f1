use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use finledger_accounting::{Account, Currency};
use finledger_core::{AccountId, CurrencyId, DomainError, TransactionId, index_by_id};
use finledger_events::{Flow, Transaction, Transfer};

use super::r#trait::{AccountEvents, CurrencyEvents, EventSource, SourceError};

/// A full export of recorded data, as a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub currencies: Vec<Currency>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub transfers: Vec<Transfer>,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

impl Snapshot {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let snapshot = Self::from_reader(BufReader::new(file))?;
        debug!(
            path = %path.display(),
            accounts = snapshot.accounts.len(),
            transactions = snapshot.transactions.len(),
            transfers = snapshot.transfers.len(),
            flows = snapshot.flows.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Events of one account. A snapshot listing an account id twice is
    /// rejected, whichever account is asked for.
    pub fn account_events(&self, account_id: AccountId) -> Result<AccountEvents, SourceError> {
        let accounts = index_by_id("account", &self.accounts)?;
        let account = accounts
            .get(&account_id)
            .map(|a| (*a).clone())
            .ok_or_else(|| DomainError::not_found(format!("account {account_id}")))?;

        let transactions: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.account_id == Some(account_id))
            .cloned()
            .collect();
        let transfers: Vec<Transfer> = self
            .transfers
            .iter()
            .filter(|t| t.touches(account_id))
            .cloned()
            .collect();

        let peers: BTreeMap<AccountId, String> = transfers
            .iter()
            .filter_map(|t| t.peer_of(account_id))
            .filter_map(|peer| accounts.get(&peer).map(|a| (peer, a.name.clone())))
            .collect();

        Ok(AccountEvents {
            account,
            transactions,
            transfers,
            peers,
        })
    }

    pub fn currency_events(&self, currency_id: CurrencyId) -> Result<CurrencyEvents, SourceError> {
        let currency = self
            .currencies
            .iter()
            .find(|c| c.id == currency_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("currency {currency_id}")))?;

        let accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|a| a.currency_id == currency_id)
            .cloned()
            .collect();
        let account_ids: BTreeSet<AccountId> = accounts.iter().map(|a| a.id).collect();

        let transactions: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.currency_id == currency_id)
            .cloned()
            .collect();
        let transaction_ids: BTreeSet<TransactionId> =
            transactions.iter().map(|t| t.id).collect();

        let transfers = self
            .transfers
            .iter()
            .filter(|t| account_ids.contains(&t.src_id) || account_ids.contains(&t.dst_id))
            .cloned()
            .collect();
        let flows = self
            .flows
            .iter()
            .filter(|f| transaction_ids.contains(&f.transaction_id))
            .cloned()
            .collect();

        Ok(CurrencyEvents {
            currency,
            accounts,
            transactions,
            transfers,
            flows,
        })
    }
}

/// Immutable event source backed by a loaded [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotEventSource {
    snapshot: Snapshot,
}

impl SnapshotEventSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Snapshot::open(path).map(Self::new)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        Snapshot::from_reader(reader).map(Self::new)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl EventSource for SnapshotEventSource {
    fn account_events(&self, account_id: AccountId) -> Result<AccountEvents, SourceError> {
        self.snapshot.account_events(account_id)
    }

    fn currency_events(&self, currency_id: CurrencyId) -> Result<CurrencyEvents, SourceError> {
        self.snapshot.currency_events(currency_id)
    }

    fn currencies(&self) -> Result<Vec<Currency>, SourceError> {
        Ok(self.snapshot.currencies.clone())
    }
}
