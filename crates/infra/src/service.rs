//! Report orchestration: fetch scoped events, replay them, shape the result.
//!
//! Each call is a fresh replay over the source. Nothing is cached between calls.

use chrono::{DateTime, Utc};
use tracing::instrument;

use finledger_accounting::{
    AccountLedger, ChangePage, ChangeQuery, Currency, DateRange, DebtTimeline, DebtTracker,
    FlowFilter, FlowPage, LedgerEntry, MonthTotals, NetWorthAggregator, NetWorthTimeline,
    Pagination, SeriesDto, account_plot, monthly_totals, reconstruct, timeline_to_dtos,
};
use finledger_core::{AccountId, CurrencyId, DomainResult};

use crate::config::ReportConfig;
use crate::event_source::{EventSource, SourceError};

/// Raw paging and filter values of a change listing, as a caller supplies them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeRequest {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

pub struct ReportService<S> {
    source: S,
    config: ReportConfig,
}

impl<S> ReportService<S>
where
    S: EventSource,
{
    pub fn new(source: S, config: ReportConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn pagination(&self, page: Option<i64>, page_size: Option<i64>) -> DomainResult<Pagination> {
        let pagination = Pagination::new(
            page.unwrap_or(0),
            page_size.unwrap_or(i64::from(self.config.page_size)),
        )?;
        Ok(pagination.capped(self.config.max_page_size))
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    pub fn account_ledger(&self, account_id: AccountId) -> Result<AccountLedger, SourceError> {
        let events = self.source.account_events(account_id)?;
        Ok(reconstruct(
            &events.account,
            &events.transactions,
            &events.transfers,
        )?)
    }

    /// Filtered, paginated change list, newest first.
    #[instrument(skip(self, request), fields(account_id = %account_id), err)]
    pub fn account_changes(
        &self,
        account_id: AccountId,
        request: &ChangeRequest,
    ) -> Result<ChangePage, SourceError> {
        let query = ChangeQuery {
            range: DateRange::new(request.start, request.end)?,
            search: request.search.clone(),
            pagination: self.pagination(request.page, request.page_size)?,
        };

        let events = self.source.account_events(account_id)?;
        let ledger = reconstruct(&events.account, &events.transactions, &events.transfers)?;
        Ok(ledger.page(&query, &events.peers)?)
    }

    /// The `n` latest entries, oldest first.
    pub fn last_changes(
        &self,
        account_id: AccountId,
        n: usize,
    ) -> Result<Vec<LedgerEntry>, SourceError> {
        Ok(self.account_ledger(account_id)?.last(n).to_vec())
    }

    pub fn current_balance(&self, account_id: AccountId) -> Result<i64, SourceError> {
        Ok(self.account_ledger(account_id)?.current_balance())
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    pub fn account_plot(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<SeriesDto, SourceError> {
        let events = self.source.account_events(account_id)?;
        let ledger = reconstruct(&events.account, &events.transactions, &events.transfers)?;
        Ok(SeriesDto::new(
            events.account.name,
            events.account.color,
            &account_plot(&ledger, now),
        ))
    }

    #[instrument(skip(self), fields(currency_id = %currency_id), err)]
    pub fn net_worth(
        &self,
        currency_id: CurrencyId,
        now: DateTime<Utc>,
    ) -> Result<NetWorthTimeline, SourceError> {
        let events = self.source.currency_events(currency_id)?;
        let aggregator = NetWorthAggregator::new(self.config.net_worth_options());
        Ok(aggregator.aggregate(events.as_input(), now)?)
    }

    pub fn net_worth_series(
        &self,
        currency_id: CurrencyId,
        now: DateTime<Utc>,
    ) -> Result<Vec<SeriesDto>, SourceError> {
        Ok(timeline_to_dtos(&self.net_worth(currency_id, now)?))
    }

    #[instrument(skip(self), fields(currency_id = %currency_id), err)]
    pub fn debt(&self, currency_id: CurrencyId) -> Result<DebtTimeline, SourceError> {
        let events = self.source.currency_events(currency_id)?;
        Ok(DebtTracker::new(self.config.debt_polarity).track(
            currency_id,
            &events.transactions,
            &events.flows,
        )?)
    }

    /// Floating flows with their running totals, filtered, newest first.
    pub fn flows(
        &self,
        currency_id: CurrencyId,
        filter: &FlowFilter,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<FlowPage, SourceError> {
        let pagination = self.pagination(page, page_size)?;
        Ok(self.debt(currency_id)?.page(filter, pagination))
    }

    #[instrument(skip(self), fields(currency_id = %currency_id), err)]
    pub fn monthly_totals(
        &self,
        currency_id: CurrencyId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MonthTotals>, SourceError> {
        let events = self.source.currency_events(currency_id)?;
        Ok(monthly_totals(currency_id, &events.transactions, start, end)?)
    }

    /// Number of events that would be orphaned if the account were removed.
    pub fn dependency_count(&self, account_id: AccountId) -> Result<usize, SourceError> {
        Ok(self.source.account_events(account_id)?.dependency_count())
    }

    pub fn currencies(&self) -> Result<Vec<Currency>, SourceError> {
        self.source.currencies()
    }
}
