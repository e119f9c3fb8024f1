//! Infrastructure layer: event sources, configuration, report orchestration.

pub mod config;
pub mod event_source;
pub mod service;

pub use config::{ConfigError, ReportConfig};
pub use event_source::{
    AccountEvents, CurrencyEvents, EventSource, InMemoryEventSource, Snapshot,
    SnapshotEventSource, SourceError,
};
pub use service::{ChangeRequest, ReportService};
