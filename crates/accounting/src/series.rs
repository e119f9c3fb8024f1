//! Chart-ready series.
//!
//! Internal timelines carry typed timestamps; the external shape is a list of
//! `{x, y}` pairs with RFC 3339 strings, one list per series.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::AccountLedger;
use crate::net_worth::NetWorthTimeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub occurred_at: DateTime<Utc>,
    pub value: i64,
}

impl Point {
    pub fn new(occurred_at: DateTime<Utc>, value: i64) -> Self {
        Self { occurred_at, value }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointDto {
    pub x: String,
    pub y: i64,
}

impl From<&Point> for PointDto {
    fn from(point: &Point) -> Self {
        Self {
            x: point.occurred_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            y: point.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesDto {
    pub id: String,
    pub color: String,
    pub data: Vec<PointDto>,
}

impl SeriesDto {
    pub fn new(id: impl Into<String>, color: impl Into<String>, points: &[Point]) -> Self {
        Self {
            id: id.into(),
            color: color.into(),
            data: points.iter().map(PointDto::from).collect(),
        }
    }
}

/// One series per account in stacking order, then the debt series.
pub fn timeline_to_dtos(timeline: &NetWorthTimeline) -> Vec<SeriesDto> {
    timeline
        .accounts
        .iter()
        .map(|a| SeriesDto::new(a.name.clone(), a.color.clone(), &a.points))
        .chain(std::iter::once(SeriesDto::new(
            timeline.debt.name.clone(),
            timeline.debt.color.clone(),
            &timeline.debt.points,
        )))
        .collect()
}

/// Step plot of a single account: the opening balance at creation, one
/// point per change, and the current balance again at `now`.
pub fn account_plot(ledger: &AccountLedger, now: DateTime<Utc>) -> Vec<Point> {
    use finledger_events::Event;

    let mut points = Vec::with_capacity(ledger.len() + 2);
    points.push(Point::new(ledger.date_created(), ledger.starting_saldo()));
    points.extend(
        ledger
            .entries()
            .iter()
            .map(|e| Point::new(e.change.occurred_at(), e.running_balance)),
    );
    points.push(Point::new(now, ledger.current_balance()));
    points
}
