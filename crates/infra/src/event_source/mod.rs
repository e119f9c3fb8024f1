//! Read-only event source boundary.
//!
//! Reconstruction never talks to storage directly: it asks an [`EventSource`]
//! for the events of one account or one currency and replays them.

pub mod in_memory;
pub mod snapshot;
pub mod r#trait;

pub use in_memory::InMemoryEventSource;
pub use snapshot::{Snapshot, SnapshotEventSource};
pub use r#trait::{AccountEvents, CurrencyEvents, EventSource, SourceError};
