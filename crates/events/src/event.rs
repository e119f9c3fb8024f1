use chrono::{DateTime, Utc};

/// A timestamped financial fact. Corrections arrive as new events, never as
/// edits of old ones.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable name, e.g. `ledger.transfer`.
    fn event_type(&self) -> &'static str;

    fn occurred_at(&self) -> DateTime<Utc>;
}
