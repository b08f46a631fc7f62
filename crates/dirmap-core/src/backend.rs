//! Seams to the collaborators the driver acts on.
//!
//! `ActionExecutor` is the acquire/release RPC layer plus the writer of the
//! authoritative directory map. `PolicyHooks` is the policy layer's own view
//! of that map, updated around each action as the transition table directs.

use crate::error::Result;

pub trait ActionExecutor {
    /// Ask `peer` to take over replication of `directory`.
    fn acquire(&mut self, directory: &str, peer: &str) -> Result<()>;
    /// Ask `peer` to stop replicating `directory`.
    fn release(&mut self, directory: &str, peer: &str) -> Result<()>;
    /// Persist `directory -> peer` in the authoritative map.
    fn map_update(&mut self, directory: &str, peer: &str) -> Result<()>;
    /// Delete the authoritative map entry for `directory`.
    fn map_remove(&mut self, directory: &str) -> Result<()>;
}

pub trait PolicyHooks {
    fn apply_map(&mut self, directory: &str, peer: &str) -> Result<()>;
    fn invalidate_map(&mut self, directory: &str) -> Result<()>;
    fn remove_map(&mut self, directory: &str) -> Result<()>;
}

/// Anything that can serve both seams.
pub trait Backend: ActionExecutor + PolicyHooks {}

impl<T: ActionExecutor + PolicyHooks + ?Sized> Backend for T {}
