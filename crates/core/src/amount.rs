//! Integer minor-unit arithmetic.
//!
//! Inputs are unsigned minor units; every accumulated value is a signed `i64`.
//! No floating point is involved anywhere. Values that leave the `i64` range
//! are reported as an inconsistent snapshot instead of being clamped.

use crate::error::{DomainError, DomainResult};

/// Signed effect of an unsigned amount: `-amount` when `negative`, else `+amount`.
pub fn signed_effect(amount: u64, negative: bool) -> DomainResult<i64> {
    let magnitude = i64::try_from(amount).map_err(|_| {
        DomainError::inconsistent(format!("amount {amount} does not fit a signed balance"))
    })?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// `balance + delta`, failing instead of wrapping.
pub fn checked_sum(balance: i64, delta: i64) -> DomainResult<i64> {
    balance.checked_add(delta).ok_or_else(|| {
        DomainError::inconsistent(format!("balance {balance} overflows when adding {delta}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_follows_flag() {
        assert_eq!(signed_effect(3000, true), Ok(-3000));
        assert_eq!(signed_effect(3000, false), Ok(3000));
        assert_eq!(signed_effect(0, true), Ok(0));
        assert_eq!(signed_effect(i64::MAX as u64, true), Ok(-i64::MAX));
    }

    #[test]
    fn oversized_amounts_are_inconsistent() {
        let err = signed_effect(u64::MAX, false).unwrap_err();
        assert!(matches!(err, DomainError::InconsistentSnapshot(_)));
        assert!(signed_effect(i64::MAX as u64 + 1, true).is_err());
    }

    #[test]
    fn sums_fail_at_the_range_edges() {
        assert_eq!(checked_sum(i64::MAX - 10, 10), Ok(i64::MAX));
        assert_eq!(checked_sum(-5, -7), Ok(-12));

        let err = checked_sum(i64::MAX - 10, 100).unwrap_err();
        assert!(matches!(err, DomainError::InconsistentSnapshot(_)));
        assert!(checked_sum(i64::MIN, -1).is_err());
    }
}
