//! Financial events: the immutable inputs of every reconstruction.
//!
//! Events carry no running balance. Every balance is derived on demand by
//! replaying them through a [`Projection`].

pub mod change;
pub mod event;
pub mod flow;
pub mod projection;
pub mod transaction;
pub mod transfer;

pub use change::{AccountChange, ChangeKind, ChangeSlot, ChangeSortKey};
pub use event::Event;
pub use flow::Flow;
pub use projection::{Projection, replay, try_replay};
pub use transaction::{CategorySplit, Counterparty, Transaction};
pub use transfer::Transfer;
