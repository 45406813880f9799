//! State identity bookkeeping.

use std::collections::HashMap;
use std::fmt;

/// Opaque identifier for a named conversation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(u32);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state#{}", self.0)
    }
}

/// Assigns and memoizes a unique [`StateId`] per state name.
///
/// Registration is idempotent: a name always resolves to the id it was first
/// given. The table only grows and is fixed once the engine is built.
#[derive(Debug, Default)]
pub struct StateRegistry {
    by_name: HashMap<String, StateId>,
    names: Vec<String>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, assigning a fresh one on first sight.
    pub fn register(&mut self, name: &str) -> StateId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }

        let id = StateId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// The name a state was registered under, for logging.
    pub fn name_of(&self, id: StateId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// The id a name resolved to, if it was ever registered.
    pub fn lookup(&self, name: &str) -> Option<StateId> {
        self.by_name.get(name).copied()
    }

    /// Number of registered states.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
