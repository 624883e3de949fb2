//! Session arena
//!
//! Owns one state value per active session, keyed by a random session id.
//! Sessions never share state; every frame call looks its session up here.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::ComputeError;

/// Identifier handed out when a session starts
pub type SessionId = Uuid;

/// Owned per-session states keyed by id
#[derive(Debug)]
pub struct SessionArena<T> {
    sessions: HashMap<SessionId, T>,
}

impl<T> Default for SessionArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SessionArena<T> {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Store a new session and return its id
    pub fn insert(&mut self, state: T) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions.insert(id, state);
        id
    }

    pub fn get(&self, id: SessionId) -> Result<&T, ComputeError> {
        self.sessions
            .get(&id)
            .ok_or(ComputeError::SessionNotFound(id))
    }

    pub fn get_mut(&mut self, id: SessionId) -> Result<&mut T, ComputeError> {
        self.sessions
            .get_mut(&id)
            .ok_or(ComputeError::SessionNotFound(id))
    }

    /// Remove a session, handing its final state to the caller
    pub fn remove(&mut self, id: SessionId) -> Result<T, ComputeError> {
        self.sessions
            .remove(&id)
            .ok_or(ComputeError::SessionNotFound(id))
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.sessions.keys().copied()
    }
}
