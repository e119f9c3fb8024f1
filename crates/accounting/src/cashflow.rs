//! Income and expenses per calendar month.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use finledger_core::{CurrencyId, DomainError, DomainResult, checked_sum, signed_effect};
use finledger_events::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthTotals {
    pub month_start: DateTime<Utc>,
    /// Exclusive.
    pub month_end: DateTime<Utc>,
    /// Sum of category splits of income transactions.
    pub income: i64,
    /// Sum of category splits of expense transactions, as a positive number.
    pub expenses: i64,
}

impl MonthTotals {
    pub fn net(&self) -> DomainResult<i64> {
        checked_sum(self.income, -self.expenses)
    }

    fn is_empty(&self) -> bool {
        self.income == 0 && self.expenses == 0
    }
}

fn first_of_next_month(at: DateTime<Utc>) -> DomainResult<DateTime<Utc>> {
    let date = at.date_naive();
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| DomainError::invalid_range(format!("no month follows {at}")))
}

/// Bucket the category splits of `currency_id` transactions in `[start, end)`
/// by calendar month.
///
/// The first bucket starts at `start`, the last one is cut at `end`. Leading
/// months without any activity are dropped.
pub fn monthly_totals(
    currency_id: CurrencyId,
    transactions: &[Transaction],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> DomainResult<Vec<MonthTotals>> {
    if end <= start {
        return Err(DomainError::invalid_range(format!(
            "end {end} must be after start {start}"
        )));
    }

    let mut months = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next = first_of_next_month(cursor)?.min(end);
        months.push(MonthTotals {
            month_start: cursor,
            month_end: next,
            income: 0,
            expenses: 0,
        });
        cursor = next;
    }

    for tx in transactions {
        if tx.currency_id != currency_id || tx.occurred_at < start || tx.occurred_at >= end {
            continue;
        }
        let idx = months.partition_point(|m| m.month_end <= tx.occurred_at);
        let Some(month) = months.get_mut(idx) else {
            continue;
        };
        let mut split_sum = 0i64;
        for record in &tx.records {
            split_sum = checked_sum(split_sum, signed_effect(record.amount, false)?)?;
        }
        if tx.is_expense {
            month.expenses = checked_sum(month.expenses, split_sum)?;
        } else {
            month.income = checked_sum(month.income, split_sum)?;
        }
    }

    let first_active = months
        .iter()
        .position(|m| !m.is_empty())
        .unwrap_or(months.len());
    months.drain(..first_active);
    Ok(months)
}
