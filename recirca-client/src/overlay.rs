//! Optimistic local edits, kept as an overlay beside the canonical view.
//!
//! A locally issued action applies its effect immediately and records an
//! undo snapshot keyed by an action token. The authoritative round-trip
//! either settles the action (snapshot dropped) or conflicts (snapshot
//! restored by the caller). The canonical view is never mutated blindly.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

/// Identifies one in-flight local action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionToken(Uuid);

impl ActionToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Undo snapshots for in-flight optimistic actions.
#[derive(Debug)]
pub struct OptimisticOverlay<S> {
    pending: HashMap<ActionToken, S>,
}

impl<S> Default for OptimisticOverlay<S> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }
}

impl<S> OptimisticOverlay<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the undo snapshot for a just-applied optimistic edit.
    pub fn begin(&mut self, undo: S) -> ActionToken {
        let token = ActionToken::new();
        self.pending.insert(token, undo);
        token
    }

    /// The action was confirmed by the server; the snapshot is obsolete.
    pub fn settle(&mut self, token: ActionToken) -> bool {
        self.pending.remove(&token).is_some()
    }

    /// The action conflicted; hand the snapshot back for restoration.
    pub fn rollback(&mut self, token: ActionToken) -> Option<S> {
        self.pending.remove(&token)
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Drop all snapshots, e.g. when a snapshot fetch supersedes every
    /// in-flight action.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
