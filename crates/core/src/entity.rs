//! Identity of snapshot records.

use std::collections::BTreeMap;

use crate::error::{DomainError, DomainResult};

/// A record addressed by a typed id.
pub trait Entity {
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    fn id(&self) -> Self::Id;
}

/// Index entities by id. A repeated id is an inconsistent snapshot.
pub fn index_by_id<'a, E: Entity>(
    kind: &str,
    items: impl IntoIterator<Item = &'a E>,
) -> DomainResult<BTreeMap<E::Id, &'a E>>
where
    E: 'a,
{
    let mut index = BTreeMap::new();
    for item in items {
        if index.insert(item.id(), item).is_some() {
            return Err(DomainError::inconsistent(format!(
                "{kind} {} appears more than once",
                item.id()
            )));
        }
    }
    Ok(index)
}
