use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use dirmap_core::state::MirrorState;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let state = MirrorState::load(root).context("failed to load state")?;

    if json {
        let dirs: Vec<serde_json::Value> = state
            .directories
            .values()
            .map(|r| {
                serde_json::json!({
                    "directory": r.path,
                    "state": r.state,
                    "peer": r.peer,
                    "target_peer": r.target_peer,
                    "last_action": r.last_action,
                    "idle": r.is_idle(),
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "directories": dirs,
            "stuck": state.stuck().len(),
        }));
    }

    if state.directories.is_empty() {
        println!("No directories tracked.");
        return Ok(());
    }

    let rows = state
        .directories
        .values()
        .map(|r| {
            vec![
                r.path.clone(),
                r.state.to_string(),
                or_dash(r.peer.as_deref()),
                or_dash(r.target_peer.as_deref()),
                r.last_action.to_string(),
            ]
        })
        .collect();
    print_table(&["PATH", "STATE", "PEER", "TARGET", "LAST"], rows);

    let stuck = state.stuck();
    if !stuck.is_empty() {
        println!();
        println!(
            "{} director{} mid-sequence; run `dirmap dir resume <path>` or `dirmap dir resync <path>`",
            stuck.len(),
            if stuck.len() == 1 { "y is" } else { "ies are" }
        );
    }
    Ok(())
}
