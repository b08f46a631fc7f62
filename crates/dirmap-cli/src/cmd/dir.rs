use crate::output::{or_dash, print_json};
use anyhow::Context;
use clap::Subcommand;
use dirmap_core::{
    config::Config,
    directory::{DesiredTransition, DirectoryRecord},
    driver::Driver,
    local::LocalBackend,
    state::MirrorState,
    LifecycleState,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum DirSubcommand {
    /// Start tracking a directory (initializes it if the map already names an owner)
    Add { path: String },

    /// Associate an unassociated directory with PEER
    Assign { path: String, peer: String },

    /// Move an associated directory to PEER
    Shuffle { path: String, peer: String },

    /// Disassociate the directory and stop tracking it
    Remove { path: String },

    /// Continue a sequence that stopped after a failed action
    Resume { path: String },

    /// Reset the directory from the authoritative map and drive it again
    Resync { path: String },

    /// Show one directory
    Show { path: String },
}

pub fn run(root: &Path, subcmd: DirSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        DirSubcommand::Add { path } => add(root, &path, json),
        DirSubcommand::Assign { path, peer } => {
            transition(root, &path, DesiredTransition::Associate, &peer, json)
        }
        DirSubcommand::Shuffle { path, peer } => {
            transition(root, &path, DesiredTransition::Shuffle, &peer, json)
        }
        DirSubcommand::Remove { path } => remove(root, &path, json),
        DirSubcommand::Resume { path } => resume(root, &path, json),
        DirSubcommand::Resync { path } => resync(root, &path, json),
        DirSubcommand::Show { path } => {
            let state = MirrorState::load(root).context("failed to load state")?;
            show(&state, &path, json)
        }
    }
}

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

struct Session {
    config: Config,
    state: MirrorState,
}

impl Session {
    fn open(root: &Path) -> anyhow::Result<Self> {
        let config = Config::load(root).context("failed to load config")?;
        let mut state = MirrorState::load(root).context("failed to load state")?;
        state.backend.attach_peers(&config);
        Ok(Self { config, state })
    }

    /// Run `f` against one record, persist whatever progress it made, then
    /// surface its error.
    fn drive<F>(&mut self, root: &Path, path: &str, f: F) -> anyhow::Result<LifecycleState>
    where
        F: FnOnce(&Driver, &mut DirectoryRecord, &mut LocalBackend) -> dirmap_core::Result<LifecycleState>,
    {
        let driver = Driver::new(self.config.driver.clone());
        let result = {
            let (record, backend) = self.state.split_mut(path)?;
            f(&driver, record, backend)
        };
        self.state.save(root).context("failed to save state")?;
        result.with_context(|| format!("{path} did not settle"))
    }

    fn require_peer(&self, peer: &str) -> anyhow::Result<()> {
        if self.config.peer(peer).is_none() {
            anyhow::bail!("unknown peer '{peer}'; add it with `dirmap init --peer {peer}`");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn add(root: &Path, path: &str, json: bool) -> anyhow::Result<()> {
    let mut session = Session::open(root)?;
    session.state.add_directory(path)?;

    let mapped = session.state.backend.mapped_peer(path).map(str::to_string);
    match mapped {
        Some(peer) => {
            session.drive(root, path, |driver, record, backend| {
                driver.run(record, DesiredTransition::Initialize, Some(&peer), backend)
            })?;
        }
        None => session.state.save(root).context("failed to save state")?,
    }

    show(&session.state, path, json)
}

fn transition(
    root: &Path,
    path: &str,
    desired: DesiredTransition,
    peer: &str,
    json: bool,
) -> anyhow::Result<()> {
    let mut session = Session::open(root)?;
    session.require_peer(peer)?;
    session.drive(root, path, |driver, record, backend| {
        driver.run(record, desired, Some(peer), backend)
    })?;
    show(&session.state, path, json)
}

fn remove(root: &Path, path: &str, json: bool) -> anyhow::Result<()> {
    let mut session = Session::open(root)?;
    if session.state.directory(path)?.state == LifecycleState::Associated {
        session.drive(root, path, |driver, record, backend| {
            driver.run(record, DesiredTransition::Disassociate, None, backend)
        })?;
    }
    session.state.remove_directory(path)?;
    session.state.save(root).context("failed to save state")?;

    if json {
        print_json(&serde_json::json!({ "directory": path, "removed": true }))?;
    } else {
        println!("Removed {path}");
    }
    Ok(())
}

fn resume(root: &Path, path: &str, json: bool) -> anyhow::Result<()> {
    let mut session = Session::open(root)?;
    if session.state.directory(path)?.is_idle() {
        if !json {
            println!("{path} is idle; nothing to resume");
        }
    } else {
        session.drive(root, path, |driver, record, backend| driver.drive(record, backend))?;
    }
    show(&session.state, path, json)
}

fn resync(root: &Path, path: &str, json: bool) -> anyhow::Result<()> {
    let mut session = Session::open(root)?;
    session.drive(root, path, |driver, record, backend| {
        let mapped = backend.mapped_peer(&record.path).map(str::to_string);
        record.resync(mapped.as_deref());
        driver.drive(record, backend)
    })?;
    show(&session.state, path, json)
}

fn show(state: &MirrorState, path: &str, json: bool) -> anyhow::Result<()> {
    let record = state.directory(path)?;
    let map_peer = state.backend.mapped_peer(path);
    let holder = state.backend.holder(path);

    if json {
        #[derive(serde::Serialize)]
        struct View<'a> {
            #[serde(flatten)]
            record: &'a DirectoryRecord,
            map_peer: Option<&'a str>,
            holder: Option<&'a str>,
        }
        return print_json(&View {
            record,
            map_peer,
            holder,
        });
    }

    println!("Directory:   {}", record.path);
    println!("State:       {}", record.state);
    println!("Peer:        {}", or_dash(record.peer.as_deref()));
    println!("Target:      {}", or_dash(record.target_peer.as_deref()));
    println!("Last action: {}", record.last_action);
    println!("Map:         {}", or_dash(map_peer));
    println!("Held by:     {}", or_dash(holder));
    Ok(())
}
