//! Drives a directory through the transition table.
//!
//! The driver owns no state of its own: each call borrows the directory's
//! record mutably, so one record can only ever have one sequence in flight.

use crate::backend::Backend;
use crate::config::DriverConfig;
use crate::directory::{DesiredTransition, DirectoryRecord};
use crate::error::{DirMapError, Result};
use crate::transition::transit;
use crate::types::{ActionType, LifecycleState, PolicyAction};
use tracing::{debug, error, info, warn};

/// What a single `step` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The action completed; the record now sits after it.
    Progressed(ActionType),
    /// The sequence finished and the record settled in this state.
    Settled(LifecycleState),
}

pub struct Driver {
    config: DriverConfig,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Begin `desired` on an idle record and drive it to completion.
    pub fn run<B: Backend + ?Sized>(
        &self,
        record: &mut DirectoryRecord,
        desired: DesiredTransition,
        peer: Option<&str>,
        backend: &mut B,
    ) -> Result<LifecycleState> {
        record.begin(desired, peer)?;
        info!(
            directory = %record.path,
            transition = %desired,
            state = %record.state,
            peer = record.acting_peer().unwrap_or("-"),
            "transition started"
        );
        self.drive(record, backend)
    }

    /// Step until the record is idle. Resumes from the last completed action,
    /// so a sequence abandoned after a failure picks up where it stopped.
    pub fn drive<B: Backend + ?Sized>(
        &self,
        record: &mut DirectoryRecord,
        backend: &mut B,
    ) -> Result<LifecycleState> {
        while !record.is_idle() {
            self.step(record, backend)?;
        }
        Ok(record.state)
    }

    pub fn step<B: Backend + ?Sized>(
        &self,
        record: &mut DirectoryRecord,
        backend: &mut B,
    ) -> Result<StepOutcome> {
        let transition = transit(record.state, record.last_action).inspect_err(|e| {
            error!(directory = %record.path, error = %e, "no step for tracked position");
        })?;

        if let Some(final_state) = transition.final_state {
            record.settle(final_state);
            info!(
                directory = %record.path,
                state = %final_state,
                peer = record.peer.as_deref().unwrap_or("-"),
                "transition settled"
            );
            return Ok(StepOutcome::Settled(final_state));
        }

        let action = transition.next_action;
        if let Some(hook) = transition.start_policy_action {
            apply_hook(hook, record, backend)?;
        }
        self.execute(action, record, backend)?;
        if let Some(hook) = transition.finish_policy_action {
            apply_hook(hook, record, backend)?;
        }
        record.complete(action);
        debug!(directory = %record.path, state = %record.state, %action, "action completed");
        Ok(StepOutcome::Progressed(action))
    }

    fn execute<B: Backend + ?Sized>(
        &self,
        action: ActionType,
        record: &DirectoryRecord,
        backend: &mut B,
    ) -> Result<()> {
        let attempts = self.config.max_attempts.max(1);
        let mut last_err = None;
        for attempt in 1..=attempts {
            match dispatch(action, record, backend) {
                Ok(()) => return Ok(()),
                Err(e @ DirMapError::InvalidPeer { .. }) => return Err(e),
                Err(e) => {
                    warn!(
                        directory = %record.path,
                        %action,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "action failed"
                    );
                    last_err = Some(e);
                    if attempt < attempts && self.config.retry_delay_ms > 0 {
                        std::thread::sleep(self.config.retry_delay());
                    }
                }
            }
        }
        Err(DirMapError::ActionFailed {
            directory: record.path.clone(),
            action,
            attempts,
            reason: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

fn peer_for<'a>(peer: Option<&'a str>, record: &DirectoryRecord, what: &str) -> Result<&'a str> {
    peer.ok_or_else(|| DirMapError::InvalidPeer {
        peer: String::new(),
        reason: format!("no peer to {what} {}", record.path),
    })
}

fn dispatch<B: Backend + ?Sized>(
    action: ActionType,
    record: &DirectoryRecord,
    backend: &mut B,
) -> Result<()> {
    let dir = record.path.as_str();
    match action {
        ActionType::None => Ok(()),
        ActionType::Acquire => {
            let peer = peer_for(record.acting_peer(), record, "acquire")?;
            backend.acquire(dir, peer)
        }
        ActionType::Release => {
            let peer = peer_for(record.peer.as_deref(), record, "release")?;
            backend.release(dir, peer)
        }
        ActionType::MapUpdate => {
            let peer = peer_for(record.target_peer.as_deref(), record, "map")?;
            backend.map_update(dir, peer)
        }
        ActionType::MapRemove => backend.map_remove(dir),
    }
}

fn apply_hook<B: Backend + ?Sized>(
    hook: PolicyAction,
    record: &DirectoryRecord,
    backend: &mut B,
) -> Result<()> {
    let dir = record.path.as_str();
    debug!(directory = %dir, %hook, "policy hook");
    match hook {
        PolicyAction::Map => {
            let peer = peer_for(record.target_peer.as_deref(), record, "map")?;
            backend.apply_map(dir, peer)
        }
        PolicyAction::Unmap => backend.invalidate_map(dir),
        PolicyAction::Remove => backend.remove_map(dir),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
