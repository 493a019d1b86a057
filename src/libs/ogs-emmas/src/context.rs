//! UE security context store

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use ogs_nas::eps::EmmSecurityContext;

use crate::primitive::UeId;

/// Read access to the per-UE EPS security contexts
///
/// The service access point only reads contexts; counters are advanced
/// and contexts activated by the owner of the store.
pub trait ContextStore {
    /// Security context of `ue_id`, `None` while no NAS security exists
    fn lookup(&self, ue_id: UeId) -> Option<EmmSecurityContext>;
}

/// Security contexts kept in a hash map
#[derive(Debug, Default)]
pub struct InMemoryContextStore {
    contexts: RwLock<HashMap<UeId, EmmSecurityContext>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the context of a UE
    pub fn insert(&self, ue_id: UeId, ctx: EmmSecurityContext) -> Option<EmmSecurityContext> {
        self.contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ue_id, ctx)
    }

    /// Remove the context of a UE
    pub fn remove(&self, ue_id: UeId) -> Option<EmmSecurityContext> {
        self.contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ue_id)
    }

    /// Update the context of a UE in place; false when the UE is unknown
    pub fn update<F>(&self, ue_id: UeId, f: F) -> bool
    where
        F: FnOnce(&mut EmmSecurityContext),
    {
        match self
            .contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&ue_id)
        {
            Some(ctx) => {
                f(ctx);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContextStore for InMemoryContextStore {
    fn lookup(&self, ue_id: UeId) -> Option<EmmSecurityContext> {
        self.contexts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ue_id)
            .cloned()
    }
}
