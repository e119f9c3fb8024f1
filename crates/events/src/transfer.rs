use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finledger_core::{AccountId, DomainError, DomainResult, Entity, TransferId, signed_effect};

use crate::Event;

/// Money moved between two accounts.
///
/// Each side carries its own amount, already expressed in that side's
/// currency. The source is debited, the destination credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub occurred_at: DateTime<Utc>,
    pub src_id: AccountId,
    pub dst_id: AccountId,
    pub src_amount: u64,
    pub dst_amount: u64,
    #[serde(default)]
    pub comment: String,
}

impl Transfer {
    /// A transfer must connect two distinct accounts.
    pub fn validate(&self) -> DomainResult<()> {
        if self.src_id == self.dst_id {
            return Err(DomainError::inconsistent(format!(
                "transfer {} moves money from account {} to itself",
                self.id, self.src_id
            )));
        }
        Ok(())
    }

    pub fn touches(&self, account_id: AccountId) -> bool {
        self.src_id == account_id || self.dst_id == account_id
    }

    /// Effect on `account_id`, or `None` when the transfer does not touch it.
    pub fn effect_for(&self, account_id: AccountId) -> DomainResult<Option<i64>> {
        if self.src_id == account_id {
            signed_effect(self.src_amount, true).map(Some)
        } else if self.dst_id == account_id {
            signed_effect(self.dst_amount, false).map(Some)
        } else {
            Ok(None)
        }
    }

    /// The account on the other side of `account_id`.
    pub fn peer_of(&self, account_id: AccountId) -> Option<AccountId> {
        if self.src_id == account_id {
            Some(self.dst_id)
        } else if self.dst_id == account_id {
            Some(self.src_id)
        } else {
            None
        }
    }
}

impl Event for Transfer {
    fn event_type(&self) -> &'static str {
        "ledger.transfer"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl Entity for Transfer {
    type Id = TransferId;

    fn id(&self) -> TransferId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn transfer(src: u64, dst: u64) -> Transfer {
        Transfer {
            id: TransferId::new(1),
            occurred_at: Utc.with_ymd_and_hms(2023, 1, 10, 0, 0, 0).unwrap(),
            src_id: AccountId::new(src),
            dst_id: AccountId::new(dst),
            src_amount: 5000,
            dst_amount: 4800,
            comment: String::new(),
        }
    }

    #[test]
    fn each_side_uses_its_own_amount() {
        let t = transfer(1, 2);
        assert_eq!(t.effect_for(AccountId::new(1)), Ok(Some(-5000)));
        assert_eq!(t.effect_for(AccountId::new(2)), Ok(Some(4800)));
        assert_eq!(t.effect_for(AccountId::new(3)), Ok(None));
    }

    #[test]
    fn peer_is_the_opposite_side() {
        let t = transfer(1, 2);
        assert_eq!(t.peer_of(AccountId::new(2)), Some(AccountId::new(1)));
        assert!(t.touches(AccountId::new(1)));
        assert!(!t.touches(AccountId::new(7)));
    }

    #[test]
    fn self_transfer_is_rejected() {
        let err = transfer(4, 4).validate().unwrap_err();
        assert!(matches!(err, DomainError::InconsistentSnapshot(_)));
    }
}
