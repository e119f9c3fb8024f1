//! Balance-history reconstruction.
//!
//! Pure domain logic only: no IO, no persistence, no clock. Every function is
//! a full replay of the events it is handed.

pub mod account;
pub mod cashflow;
pub mod debt;
pub mod ledger;
pub mod net_worth;
pub mod query;
pub mod series;

pub use account::{Account, Currency};
pub use cashflow::{MonthTotals, monthly_totals};
pub use debt::{
    DebtAccumulator, DebtPoint, DebtPolarity, DebtTimeline, DebtTracker, FlowFilter, FlowPage,
    JoinedFlow,
};
pub use ledger::{
    AccountLedger, ChangePage, ChangeRow, LedgerEntry, RunningBalance, reconstruct,
};
pub use net_worth::{
    AccountSeries, DEFAULT_DEBT_SERIES_COLOR, DEFAULT_DEBT_SERIES_NAME, DebtSeries,
    NetWorthAggregator, NetWorthInput, NetWorthOptions, NetWorthTimeline,
};
pub use query::{ChangeQuery, DEFAULT_PAGE_SIZE, DateRange, Pagination, matches_search};
pub use series::{Point, PointDto, SeriesDto, account_plot, timeline_to_dtos};
