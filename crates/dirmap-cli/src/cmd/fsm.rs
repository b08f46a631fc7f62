use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use dirmap_core::{
    transition::{self, Step},
    ActionType, LifecycleState, Transition,
};

fn parse_state(s: &str) -> anyhow::Result<LifecycleState> {
    s.parse()
        .with_context(|| format!("expected one of: {}", names(LifecycleState::all())))
}

fn parse_action(s: &str) -> anyhow::Result<ActionType> {
    s.parse()
        .with_context(|| format!("expected one of: {}", names(ActionType::all())))
}

fn names<T: ToString>(all: &[T]) -> String {
    all.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}

fn transition_cells(t: &Transition) -> Vec<String> {
    vec![
        t.next_action.to_string(),
        or_dash(t.start_policy_action),
        or_dash(t.finish_policy_action),
        or_dash(t.final_state),
    ]
}

pub fn table(json: bool) -> anyhow::Result<()> {
    let entries = transition::entries();

    if json {
        #[derive(serde::Serialize)]
        struct Entry<'a> {
            state: LifecycleState,
            after: ActionType,
            #[serde(flatten)]
            transition: &'a Transition,
        }
        let rows: Vec<Entry> = entries
            .iter()
            .map(|(key, t)| Entry {
                state: key.state,
                after: key.action,
                transition: t,
            })
            .collect();
        return print_json(&rows);
    }

    let rows = entries
        .iter()
        .map(|(key, t)| {
            let mut row = vec![key.state.to_string(), key.action.to_string()];
            row.extend(transition_cells(t));
            row
        })
        .collect();
    print_table(&["STATE", "AFTER", "NEXT", "START", "FINISH", "FINAL"], rows);
    Ok(())
}

pub fn transit(state: &str, action: &str, json: bool) -> anyhow::Result<()> {
    let state = parse_state(state)?;
    let action = parse_action(action)?;
    let t = transition::transit(state, action)?;

    if json {
        print_json(&t)?;
    } else {
        println!("{t}");
    }
    Ok(())
}

pub fn walk(state: &str, json: bool) -> anyhow::Result<()> {
    let state = parse_state(state)?;
    let steps: Vec<Step> = transition::sequence(state)
        .with_context(|| format!("'{state}' has no action sequence"))?;

    if json {
        return print_json(&steps);
    }

    let rows = steps
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut row = vec![(i + 1).to_string(), s.after.to_string()];
            row.extend(transition_cells(&s.transition));
            row
        })
        .collect();
    print_table(&["#", "AFTER", "NEXT", "START", "FINISH", "FINAL"], rows);
    Ok(())
}

pub fn idle(state: &str, json: bool) -> anyhow::Result<()> {
    let state = parse_state(state)?;
    let idle = transition::is_idle(state);
    if json {
        print_json(&serde_json::json!({ "state": state, "idle": idle }))?;
    } else {
        println!("{idle}");
    }
    Ok(())
}
