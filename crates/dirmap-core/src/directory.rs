use crate::error::{DirMapError, Result};
use crate::paths::validate_directory;
use crate::types::{ActionType, LifecycleState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const HISTORY_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// DesiredTransition
// ---------------------------------------------------------------------------

/// A placement decision handed down by the policy layer. Only raised for
/// directories that are idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredTransition {
    /// The map already names an owner; have that peer acquire it.
    Initialize,
    Associate,
    Shuffle,
    Disassociate,
}

impl DesiredTransition {
    /// Lifecycle state entered for this decision.
    pub fn entered_state(self) -> LifecycleState {
        match self {
            DesiredTransition::Initialize => LifecycleState::Initializing,
            DesiredTransition::Associate => LifecycleState::Associating,
            DesiredTransition::Shuffle => LifecycleState::Shuffling,
            DesiredTransition::Disassociate => LifecycleState::Disassociating,
        }
    }

    /// Idle state the directory has to be in for this decision.
    pub fn required_state(self) -> LifecycleState {
        match self {
            DesiredTransition::Initialize | DesiredTransition::Associate => {
                LifecycleState::Unassociated
            }
            DesiredTransition::Shuffle | DesiredTransition::Disassociate => {
                LifecycleState::Associated
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DesiredTransition::Initialize => "initialize",
            DesiredTransition::Associate => "associate",
            DesiredTransition::Shuffle => "shuffle",
            DesiredTransition::Disassociate => "disassociate",
        }
    }
}

impl fmt::Display for DesiredTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DirectoryRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub from: LifecycleState,
    pub to: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    pub at: DateTime<Utc>,
}

/// Driver-side tracking for one mirrored directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub path: String,
    pub state: LifecycleState,
    /// Last action that completed in the current state. `None` right after
    /// entering a state.
    pub last_action: ActionType,
    /// Peer that currently owns the directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    /// Peer the in-flight sequence is moving the directory to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_peer: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<StateChange>,
}

impl DirectoryRecord {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        validate_directory(&path)?;
        Ok(Self {
            path,
            state: LifecycleState::Unassociated,
            last_action: ActionType::None,
            peer: None,
            target_peer: None,
            updated_at: Utc::now(),
            history: Vec::new(),
        })
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Enter the lifecycle state for `desired`. `peer` is the target owner;
    /// it is ignored for `Disassociate`.
    pub fn begin(&mut self, desired: DesiredTransition, peer: Option<&str>) -> Result<()> {
        if !self.is_idle() {
            return Err(DirMapError::NotIdle {
                directory: self.path.clone(),
                state: self.state,
            });
        }
        if self.state != desired.required_state() {
            return Err(DirMapError::InvalidTransition {
                state: self.state,
                action: self.last_action,
            });
        }

        let target = match desired {
            DesiredTransition::Disassociate => None,
            _ => {
                let peer = peer.ok_or_else(|| DirMapError::InvalidPeer {
                    peer: String::new(),
                    reason: format!("{desired} needs a target peer"),
                })?;
                if desired == DesiredTransition::Shuffle && self.peer.as_deref() == Some(peer) {
                    return Err(DirMapError::InvalidPeer {
                        peer: peer.to_string(),
                        reason: format!("already owns {}", self.path),
                    });
                }
                Some(peer.to_string())
            }
        };

        self.record_change(desired.entered_state(), target.clone());
        self.target_peer = target;
        Ok(())
    }

    /// Record that `action` finished successfully.
    pub fn complete(&mut self, action: ActionType) {
        self.last_action = action;
        self.updated_at = Utc::now();
    }

    /// Apply the final state of a finished sequence.
    pub fn settle(&mut self, final_state: LifecycleState) {
        match final_state {
            LifecycleState::Associated => {
                if let Some(target) = self.target_peer.take() {
                    self.peer = Some(target);
                }
            }
            LifecycleState::Unassociated => {
                self.peer = None;
                self.target_peer = None;
            }
            _ => {}
        }
        let peer = self.peer.clone();
        self.record_change(final_state, peer);
    }

    /// Abandon the in-flight sequence and restart from ground truth.
    ///
    /// With a peer named by the map the directory re-enters `Initializing`
    /// so that peer acquires it again; otherwise it drops to `Unassociated`.
    pub fn resync(&mut self, mapped_peer: Option<&str>) {
        match mapped_peer {
            Some(peer) => {
                let target = Some(peer.to_string());
                self.peer = None;
                self.target_peer = target.clone();
                self.record_change(LifecycleState::Initializing, target);
            }
            None => {
                self.peer = None;
                self.target_peer = None;
                self.record_change(LifecycleState::Unassociated, None);
            }
        }
    }

    /// Peer the next action is aimed at: the target while one is set,
    /// otherwise the current owner.
    pub fn acting_peer(&self) -> Option<&str> {
        self.target_peer.as_deref().or(self.peer.as_deref())
    }

    fn record_change(&mut self, to: LifecycleState, peer: Option<String>) {
        let now = Utc::now();
        self.history.push(StateChange {
            from: self.state,
            to,
            peer,
            at: now,
        });
        if self.history.len() > HISTORY_LIMIT {
            self.history.drain(..self.history.len() - HISTORY_LIMIT);
        }
        self.state = to;
        self.last_action = ActionType::None;
        self.updated_at = now;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
