//! Message types carried by the change signal

use std::fmt;

use uuid::Uuid;

/// Identifies one browsing context (a dock page or an overlay page)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Allocate a fresh, unique context id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the text form produced by `Display`
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text).ok().map(Self)
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification that the shared state changed
///
/// Carries no payload: receivers always re-read the full state from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Store-wide change broadcast, only delivered to other contexts
    Storage,
    /// In-page event, only delivered to the context that raised it
    Local,
}
