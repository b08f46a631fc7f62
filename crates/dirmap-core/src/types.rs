use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower-cases and maps `-` to `_` so `MAP_UPDATE`, `map-update` and
/// `map_update` all parse the same.
fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('-', "_")
}

// ---------------------------------------------------------------------------
// LifecycleState
// ---------------------------------------------------------------------------

/// Where a directory is in its assignment lifecycle.
///
/// `Unassociated` and `Associated` are idle. Every other state is an
/// in-progress sequence of actions driven through the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Unassociated,
    Initializing,
    Associating,
    Associated,
    Shuffling,
    Disassociating,
}

impl LifecycleState {
    pub fn all() -> &'static [LifecycleState] {
        &[
            LifecycleState::Unassociated,
            LifecycleState::Initializing,
            LifecycleState::Associating,
            LifecycleState::Associated,
            LifecycleState::Shuffling,
            LifecycleState::Disassociating,
        ]
    }

    pub fn is_idle(self) -> bool {
        matches!(
            self,
            LifecycleState::Unassociated | LifecycleState::Associated
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Unassociated => "unassociated",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Associating => "associating",
            LifecycleState::Associated => "associated",
            LifecycleState::Shuffling => "shuffling",
            LifecycleState::Disassociating => "disassociating",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = crate::error::DirMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n = normalize(s);
        Self::all()
            .iter()
            .copied()
            .find(|state| state.as_str() == n)
            .ok_or_else(|| crate::error::DirMapError::InvalidState(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// A unit operation the driver executes against the remote collaborators.
///
/// `None` is the sentinel for "nothing has completed yet in this state" and
/// is also what a final transition carries as its next action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    None,
    MapUpdate,
    MapRemove,
    Acquire,
    Release,
}

impl ActionType {
    pub fn all() -> &'static [ActionType] {
        &[
            ActionType::None,
            ActionType::MapUpdate,
            ActionType::MapRemove,
            ActionType::Acquire,
            ActionType::Release,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::None => "none",
            ActionType::MapUpdate => "map_update",
            ActionType::MapRemove => "map_remove",
            ActionType::Acquire => "acquire",
            ActionType::Release => "release",
        }
    }

    pub fn is_none(self) -> bool {
        self == ActionType::None
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = crate::error::DirMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n = normalize(s);
        let n = n.strip_prefix("action_type_").unwrap_or(&n);
        Self::all()
            .iter()
            .copied()
            .find(|action| action.as_str() == n)
            .ok_or_else(|| crate::error::DirMapError::InvalidAction(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// PolicyAction
// ---------------------------------------------------------------------------

/// Hook applied to the policy's view of the directory map around an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    /// Record the new owner.
    Map,
    /// Invalidate the current owner.
    Unmap,
    /// Drop the entry entirely.
    Remove,
}

impl PolicyAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyAction::Map => "map",
            PolicyAction::Unmap => "unmap",
            PolicyAction::Remove => "remove",
        }
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn idle_states() {
        let idle: Vec<_> = LifecycleState::all()
            .iter()
            .filter(|s| s.is_idle())
            .copied()
            .collect();
        assert_eq!(
            idle,
            vec![LifecycleState::Unassociated, LifecycleState::Associated]
        );
    }

    #[test]
    fn state_parses_any_case() {
        assert_eq!(
            LifecycleState::from_str("DISASSOCIATING").unwrap(),
            LifecycleState::Disassociating
        );
        assert_eq!(
            LifecycleState::from_str("shuffling").unwrap(),
            LifecycleState::Shuffling
        );
        assert!(LifecycleState::from_str("owned").is_err());
    }

    #[test]
    fn action_parses_legacy_prefix() {
        assert_eq!(
            ActionType::from_str("ACTION_TYPE_MAP_UPDATE").unwrap(),
            ActionType::MapUpdate
        );
        assert_eq!(
            ActionType::from_str("map-remove").unwrap(),
            ActionType::MapRemove
        );
        assert_eq!(ActionType::from_str("NONE").unwrap(), ActionType::None);
        assert!(ActionType::from_str("steal").is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let yaml = serde_yaml::to_string(&ActionType::MapUpdate).unwrap();
        assert_eq!(yaml.trim(), "map_update");
        let state: LifecycleState = serde_yaml::from_str("associated").unwrap();
        assert_eq!(state, LifecycleState::Associated);
    }
}
