//! Transition table for the directory assignment state machine.
//!
//! Each in-progress lifecycle state runs a fixed sequence of actions. The
//! driver looks up `(state, last completed action)` and gets back the next
//! action to run, the policy hooks that bracket it, and, on the last step,
//! the state the directory settles in. Lookups are pure; the table is built
//! once and never mutated.

use crate::error::{DirMapError, Result};
use crate::types::{ActionType, LifecycleState, PolicyAction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// TransitionKey / Transition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionKey {
    pub state: LifecycleState,
    pub action: ActionType,
}

impl TransitionKey {
    pub fn new(state: LifecycleState, action: ActionType) -> Self {
        Self { state, action }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub next_action: ActionType,
    /// Run immediately before `next_action` is issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_policy_action: Option<PolicyAction>,
    /// Run immediately after `next_action` completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_policy_action: Option<PolicyAction>,
    /// Set on the last step of a state: the directory settles here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_state: Option<LifecycleState>,
}

impl Transition {
    pub fn is_final(&self) -> bool {
        self.final_state.is_some()
    }
}

fn opt<T: fmt::Display>(v: &Option<T>) -> String {
    v.as_ref()
        .map(|x| x.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[action_type={}, start_policy_action={}, finish_policy_action={}, final_state={}]",
            self.next_action,
            opt(&self.start_policy_action),
            opt(&self.finish_policy_action),
            opt(&self.final_state)
        )
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

macro_rules! step {
    (
        $state:ident, $after:ident => $next:ident
        $(, start: $start:ident)?
        $(, finish: $finish:ident)?
        $(, settle: $final:ident)?
    ) => {
        (
            TransitionKey::new(LifecycleState::$state, ActionType::$after),
            Transition {
                next_action: ActionType::$next,
                start_policy_action: {
                    #[allow(unused_assignments, unused_mut)]
                    let mut v: Option<PolicyAction> = None;
                    $(v = Some(PolicyAction::$start);)?
                    v
                },
                finish_policy_action: {
                    #[allow(unused_assignments, unused_mut)]
                    let mut v: Option<PolicyAction> = None;
                    $(v = Some(PolicyAction::$finish);)?
                    v
                },
                final_state: {
                    #[allow(unused_assignments, unused_mut)]
                    let mut v: Option<LifecycleState> = None;
                    $(v = Some(LifecycleState::$final);)?
                    v
                },
            },
        )
    };
}

/// ACQUIRE is always the last action before `Associated`: the map names the
/// new owner before that owner is told to take the directory. On the way
/// down RELEASE comes first and the map is only cleared once it succeeds.
fn default_steps() -> Vec<(TransitionKey, Transition)> {
    vec![
        step!(Initializing, None => Acquire),
        step!(Initializing, Acquire => None, settle: Associated),
        step!(Associating, None => MapUpdate, start: Map),
        step!(Associating, MapUpdate => Acquire),
        step!(Associating, Acquire => None, settle: Associated),
        step!(Shuffling, None => Release, finish: Unmap),
        step!(Shuffling, Release => MapUpdate, start: Map),
        step!(Shuffling, MapUpdate => Acquire),
        step!(Shuffling, Acquire => None, settle: Associated),
        step!(Disassociating, None => Release, finish: Unmap),
        step!(Disassociating, Release => MapRemove, finish: Remove),
        step!(Disassociating, MapRemove => None, settle: Unassociated),
    ]
}

struct Table {
    order: Vec<(TransitionKey, Transition)>,
    index: HashMap<TransitionKey, Transition>,
}

static TABLE: OnceLock<Table> = OnceLock::new();

fn table() -> &'static Table {
    TABLE.get_or_init(|| {
        let order = default_steps();
        let index = order.iter().copied().collect();
        Table { order, index }
    })
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Next step after `action` completed in `state`. Pass `ActionType::None` to
/// get the first step of a freshly entered state.
pub fn transit(state: LifecycleState, action: ActionType) -> Result<Transition> {
    table()
        .index
        .get(&TransitionKey::new(state, action))
        .copied()
        .ok_or(DirMapError::InvalidTransition { state, action })
}

pub fn is_idle(state: LifecycleState) -> bool {
    state.is_idle()
}

/// Every table entry, grouped by state in sequence order.
pub fn entries() -> &'static [(TransitionKey, Transition)] {
    &table().order
}

/// One looked-up step of a walked sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub after: ActionType,
    #[serde(flatten)]
    pub transition: Transition,
}

/// Walk an entered state from `(state, None)` to its final step, assuming
/// every action succeeds.
pub fn sequence(state: LifecycleState) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    let mut after = ActionType::None;
    for _ in 0..entries().len() {
        let transition = transit(state, after)?;
        steps.push(Step { after, transition });
        if transition.is_final() {
            return Ok(steps);
        }
        after = transition.next_action;
    }
    Err(DirMapError::InvalidTransition {
        state,
        action: after,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const IN_PROGRESS: [LifecycleState; 4] = [
        LifecycleState::Initializing,
        LifecycleState::Associating,
        LifecycleState::Shuffling,
        LifecycleState::Disassociating,
    ];

    fn position(steps: &[Step], pred: impl Fn(&Step) -> bool) -> Option<usize> {
        steps.iter().position(pred)
    }

    #[test]
    fn every_sequence_terminates_in_expected_state() {
        for state in IN_PROGRESS {
            let steps = sequence(state).unwrap();
            let last = steps.last().unwrap();
            let expected = if state == LifecycleState::Disassociating {
                LifecycleState::Unassociated
            } else {
                LifecycleState::Associated
            };
            assert_eq!(last.transition.final_state, Some(expected), "{state}");
            assert_eq!(last.transition.next_action, ActionType::None);
            assert!(steps[..steps.len() - 1]
                .iter()
                .all(|s| !s.transition.is_final()));
        }
    }

    #[test]
    fn idle_predicate() {
        for state in LifecycleState::all() {
            let expected = matches!(
                state,
                LifecycleState::Unassociated | LifecycleState::Associated
            );
            assert_eq!(is_idle(*state), expected, "{state}");
        }
    }

    #[test]
    fn idle_states_have_no_entries() {
        for state in [LifecycleState::Unassociated, LifecycleState::Associated] {
            for action in ActionType::all() {
                assert!(matches!(
                    transit(state, *action),
                    Err(DirMapError::InvalidTransition { .. })
                ));
            }
            assert!(sequence(state).is_err());
        }
    }

    #[test]
    fn unknown_pairs_fail() {
        assert!(matches!(
            transit(LifecycleState::Unassociated, ActionType::Acquire),
            Err(DirMapError::InvalidTransition {
                state: LifecycleState::Unassociated,
                action: ActionType::Acquire,
            })
        ));
        assert!(transit(LifecycleState::Associated, ActionType::None).is_err());
        assert!(transit(LifecycleState::Initializing, ActionType::Release).is_err());
        assert!(transit(LifecycleState::Disassociating, ActionType::Acquire).is_err());
    }

    #[test]
    fn table_has_twelve_entries() {
        assert_eq!(entries().len(), 12);
        for (key, transition) in entries() {
            assert_eq!(transit(key.state, key.action).unwrap(), *transition);
        }
    }

    #[test]
    fn map_precedes_acquire() {
        for state in [LifecycleState::Associating, LifecycleState::Shuffling] {
            let steps = sequence(state).unwrap();
            let map = position(&steps, |s| {
                s.transition.start_policy_action == Some(PolicyAction::Map)
            })
            .unwrap();
            let acquire =
                position(&steps, |s| s.transition.next_action == ActionType::Acquire).unwrap();
            assert!(map < acquire, "{state}");
        }
    }

    #[test]
    fn unmap_precedes_map_changes() {
        for state in [LifecycleState::Shuffling, LifecycleState::Disassociating] {
            let steps = sequence(state).unwrap();
            let unmap = position(&steps, |s| {
                s.transition.finish_policy_action == Some(PolicyAction::Unmap)
            })
            .unwrap();
            for (i, s) in steps.iter().enumerate() {
                if matches!(
                    s.transition.next_action,
                    ActionType::MapUpdate | ActionType::MapRemove
                ) {
                    assert!(unmap < i, "{state}");
                }
            }
        }
    }

    #[test]
    fn initializing_scenario() {
        let first = transit(LifecycleState::Initializing, ActionType::None).unwrap();
        assert_eq!(first.next_action, ActionType::Acquire);
        assert_eq!(first.start_policy_action, None);
        assert_eq!(first.finish_policy_action, None);
        assert!(!first.is_final());

        let last = transit(LifecycleState::Initializing, ActionType::Acquire).unwrap();
        assert_eq!(last.next_action, ActionType::None);
        assert_eq!(last.final_state, Some(LifecycleState::Associated));
    }

    #[test]
    fn disassociating_scenario() {
        let t = transit(LifecycleState::Disassociating, ActionType::None).unwrap();
        assert_eq!(t.next_action, ActionType::Release);
        assert_eq!(t.finish_policy_action, Some(PolicyAction::Unmap));

        let t = transit(LifecycleState::Disassociating, ActionType::Release).unwrap();
        assert_eq!(t.next_action, ActionType::MapRemove);
        assert_eq!(t.finish_policy_action, Some(PolicyAction::Remove));

        let t = transit(LifecycleState::Disassociating, ActionType::MapRemove).unwrap();
        assert_eq!(t.next_action, ActionType::None);
        assert_eq!(t.final_state, Some(LifecycleState::Unassociated));
    }

    #[test]
    fn shuffling_scenario() {
        let t = transit(LifecycleState::Shuffling, ActionType::None).unwrap();
        assert_eq!(t.next_action, ActionType::Release);
        assert_eq!(t.finish_policy_action, Some(PolicyAction::Unmap));

        let t = transit(LifecycleState::Shuffling, ActionType::Release).unwrap();
        assert_eq!(t.next_action, ActionType::MapUpdate);
        assert_eq!(t.start_policy_action, Some(PolicyAction::Map));

        let t = transit(LifecycleState::Shuffling, ActionType::MapUpdate).unwrap();
        assert_eq!(t.next_action, ActionType::Acquire);
        assert_eq!(t.start_policy_action, None);

        let t = transit(LifecycleState::Shuffling, ActionType::Acquire).unwrap();
        assert_eq!(t.final_state, Some(LifecycleState::Associated));
    }

    #[test]
    fn lookup_is_repeatable() {
        let a = transit(LifecycleState::Associating, ActionType::MapUpdate).unwrap();
        let b = transit(LifecycleState::Associating, ActionType::MapUpdate).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn keys_compare_structurally() {
        use std::collections::HashSet;
        let a = TransitionKey::new(LifecycleState::Shuffling, ActionType::Release);
        let b = TransitionKey::new(LifecycleState::Shuffling, ActionType::Release);
        let c = TransitionKey::new(LifecycleState::Disassociating, ActionType::Release);
        assert_eq!(a, b);
        assert_ne!(a, c);
        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_lists_all_fields() {
        let t = transit(LifecycleState::Shuffling, ActionType::Release).unwrap();
        assert_eq!(
            t.to_string(),
            "[action_type=map_update, start_policy_action=map, finish_policy_action=none, final_state=none]"
        );
    }

    #[test]
    fn concurrent_lookups_agree() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    IN_PROGRESS
                        .iter()
                        .map(|s| sequence(*s).unwrap().len())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), vec![2, 3, 4, 3]);
        }
    }

    #[test]
    fn final_transition_omits_empty_fields_in_json() {
        let t = transit(LifecycleState::Initializing, ActionType::Acquire).unwrap();
        let json = serde_json::to_value(t).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "next_action": "none", "final_state": "associated" })
        );
    }
}
