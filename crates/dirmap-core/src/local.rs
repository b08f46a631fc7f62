//! File-backed stand-in for the remote collaborators.
//!
//! Keeps the policy view, the authoritative map and which peer currently
//! holds each directory in one serializable value so the CLI can persist
//! it next to the directory records.

use crate::backend::{ActionExecutor, PolicyHooks};
use crate::config::{Config, PeerConfig};
use crate::error::{DirMapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PolicyEntry {
    Mapped { peer: String },
    Unmapped,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalBackend {
    /// The policy layer's view of ownership.
    #[serde(default)]
    pub policy: BTreeMap<String, PolicyEntry>,
    /// Authoritative directory -> peer map.
    #[serde(default)]
    pub map: BTreeMap<String, String>,
    /// Which peer holds each directory right now.
    #[serde(default)]
    pub acquired: BTreeMap<String, String>,
    #[serde(skip)]
    peers: Vec<PeerConfig>,
}

impl LocalBackend {
    /// Load peer membership and liveness from config. Acquire consults it.
    pub fn attach_peers(&mut self, config: &Config) {
        self.peers = config.peers.clone();
    }

    pub fn mapped_peer(&self, directory: &str) -> Option<&str> {
        self.map.get(directory).map(String::as_str)
    }

    pub fn holder(&self, directory: &str) -> Option<&str> {
        self.acquired.get(directory).map(String::as_str)
    }

    fn check_peer(&self, peer: &str) -> Result<()> {
        match self.peers.iter().find(|p| p.name == peer) {
            None => Err(DirMapError::Backend(format!("unknown peer '{peer}'"))),
            Some(p) if p.offline => Err(DirMapError::Backend(format!("peer '{peer}' is offline"))),
            Some(_) => Ok(()),
        }
    }
}

impl ActionExecutor for LocalBackend {
    fn acquire(&mut self, directory: &str, peer: &str) -> Result<()> {
        self.check_peer(peer)?;
        match self.acquired.get(directory) {
            Some(holder) if holder != peer => Err(DirMapError::Backend(format!(
                "{directory} is still held by '{holder}'"
            ))),
            _ => {
                self.acquired
                    .insert(directory.to_string(), peer.to_string());
                Ok(())
            }
        }
    }

    fn release(&mut self, directory: &str, peer: &str) -> Result<()> {
        match self.acquired.get(directory) {
            Some(holder) if holder != peer => Err(DirMapError::Backend(format!(
                "{directory} is held by '{holder}', not '{peer}'"
            ))),
            _ => {
                self.acquired.remove(directory);
                Ok(())
            }
        }
    }

    fn map_update(&mut self, directory: &str, peer: &str) -> Result<()> {
        self.map.insert(directory.to_string(), peer.to_string());
        Ok(())
    }

    fn map_remove(&mut self, directory: &str) -> Result<()> {
        self.map.remove(directory);
        Ok(())
    }
}

impl PolicyHooks for LocalBackend {
    fn apply_map(&mut self, directory: &str, peer: &str) -> Result<()> {
        self.policy.insert(
            directory.to_string(),
            PolicyEntry::Mapped {
                peer: peer.to_string(),
            },
        );
        Ok(())
    }

    fn invalidate_map(&mut self, directory: &str) -> Result<()> {
        self.policy
            .insert(directory.to_string(), PolicyEntry::Unmapped);
        Ok(())
    }

    fn remove_map(&mut self, directory: &str) -> Result<()> {
        self.policy.remove(directory);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
