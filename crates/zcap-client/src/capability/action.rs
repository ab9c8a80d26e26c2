//! Capability actions.
//!
//! The engine is action-agnostic; `read` and `write` are only the defaults
//! used by the convenience calls. An empty action list never restricts
//! anything: it means "whatever the parent allows".

use crate::error::{Result, ZcapError};

/// Action used by `read` and by requests that do not name one.
pub const ACTION_READ: &str = "read";

/// Action used by `write`.
pub const ACTION_WRITE: &str = "write";

/// Caller-supplied allowed actions, accepted as a single name or a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedActions(Vec<String>);

impl AllowedActions {
    /// No explicit restriction.
    pub fn unrestricted() -> Self {
        Self(Vec::new())
    }

    /// Normalize into the list stored on a capability.
    ///
    /// Duplicates are dropped (first occurrence wins); blank names are
    /// rejected. An empty result means the field is omitted.
    pub fn normalize(&self) -> Result<Vec<String>> {
        let mut actions: Vec<String> = Vec::with_capacity(self.0.len());
        for action in &self.0 {
            let action = action.trim();
            if action.is_empty() {
                return Err(ZcapError::invalid("allowed action names must not be blank"));
            }
            if !actions.iter().any(|a| a == action) {
                actions.push(action.to_string());
            }
        }
        Ok(actions)
    }
}

impl From<&str> for AllowedActions {
    fn from(action: &str) -> Self {
        Self(vec![action.to_string()])
    }
}

impl From<String> for AllowedActions {
    fn from(action: String) -> Self {
        Self(vec![action])
    }
}

impl From<Vec<String>> for AllowedActions {
    fn from(actions: Vec<String>) -> Self {
        Self(actions)
    }
}

impl From<Vec<&str>> for AllowedActions {
    fn from(actions: Vec<&str>) -> Self {
        Self(actions.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for AllowedActions {
    fn from(actions: &[&str]) -> Self {
        Self(actions.iter().map(|a| a.to_string()).collect())
    }
}

/// Check whether `requested` only names actions permitted by `granted`.
///
/// An empty `granted` list permits everything.
pub fn actions_within(granted: &[String], requested: &[String]) -> bool {
    granted.is_empty() || requested.iter().all(|r| granted.contains(r))
}
