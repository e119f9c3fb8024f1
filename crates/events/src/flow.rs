use serde::{Deserialize, Serialize};

use finledger_core::{Entity, FlowId, TransactionId};

use crate::Counterparty;

/// Debt or credit against a counterparty, attached to a transaction.
///
/// A flow has no timestamp of its own: it happens when its transaction does.
/// Flows of remote transactions feed the floating debt aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub id: FlowId,
    pub transaction_id: TransactionId,
    /// Unsigned amount in minor units.
    pub amount: u64,
    pub is_debt: bool,
    pub agent: Counterparty,
}

impl Entity for Flow {
    type Id = FlowId;

    fn id(&self) -> FlowId {
        self.id
    }
}
