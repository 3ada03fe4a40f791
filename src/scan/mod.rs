//! Run-scoped scan state shared by every node of one workflow tree.
//!
//! A [`ScanContext`] is a bundle of shared handles: cloning it hands out
//! another reference to the same variable store and session store, never a
//! copy. The only place a run gets an independent context is
//! [`ScanContext::for_workflow_run`].

mod session;
mod variables;

pub use session::SessionStore;
pub use variables::{VariableStore, normalize_extracts};

use crate::types::TargetId;

/// Shared state for one workflow run against one target.
#[derive(Debug, Clone)]
pub struct ScanContext {
    target: TargetId,
    variables: VariableStore,
    session: SessionStore,
}

impl ScanContext {
    /// Create a context with an empty variable store and a fresh session.
    pub fn new(target: impl Into<TargetId>) -> Self {
        Self {
            target: target.into(),
            variables: VariableStore::new(),
            session: SessionStore::new(),
        }
    }

    /// Replace the variable store, e.g. to seed a run with known inputs.
    pub fn with_variables(mut self, variables: VariableStore) -> Self {
        self.variables = variables;
        self
    }

    /// Derive the context a root workflow invocation runs with.
    ///
    /// The target is kept, the current variables are copied into a new
    /// store, and a new session store is created so cookies picked up by
    /// one run never leak into an unrelated one.
    pub fn for_workflow_run(&self) -> Self {
        Self {
            target: self.target.clone(),
            variables: self.variables.deep_clone(),
            session: SessionStore::new(),
        }
    }

    pub fn target(&self) -> &TargetId {
        &self.target
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }
}
