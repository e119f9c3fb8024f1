//! `finledger-core`: shared building blocks for balance reconstruction.
//!
//! This crate contains **pure domain** primitives (no IO, no storage).

pub mod amount;
pub mod entity;
pub mod error;
pub mod id;

pub use amount::{checked_sum, signed_effect};
pub use entity::{Entity, index_by_id};
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, AgentId, CategoryId, CurrencyId, FlowId, TransactionId, TransferId};
