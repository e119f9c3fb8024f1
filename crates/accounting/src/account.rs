use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finledger_core::{AccountId, CurrencyId, Entity};

/// Currency metadata. Amounts in this currency are integers scaled by
/// `10^decimals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub id: CurrencyId,
    pub code: String,
    pub decimals: u8,
}

impl Entity for Currency {
    type Id = CurrencyId;

    fn id(&self) -> CurrencyId {
        self.id
    }
}

/// Account identity + opening state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// Display color, `#rrggbb`.
    pub color: String,
    pub currency_id: CurrencyId,
    /// Opening balance in minor units.
    pub starting_saldo: i64,
    /// No event of this account precedes this instant (upstream invariant).
    pub date_created: DateTime<Utc>,
    /// Position in the display order (lower is drawn first / lower in a stack).
    pub order: u32,
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> AccountId {
        self.id
    }
}
