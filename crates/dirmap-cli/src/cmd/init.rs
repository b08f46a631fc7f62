use crate::output::print_json;
use anyhow::Context;
use dirmap_core::{
    config::{Config, WarnLevel},
    paths,
    state::MirrorState,
    DirMapError,
};
use std::path::Path;

pub fn run(root: &Path, peers: &[String], json: bool) -> anyhow::Result<()> {
    let mut config = match Config::load(root) {
        Ok(cfg) => cfg,
        Err(DirMapError::NotInitialized) => Config::default(),
        Err(e) => return Err(e).context("failed to load config"),
    };
    for peer in peers {
        config.add_peer(peer.as_str())?;
    }
    config.save(root).context("failed to save config")?;

    let created = !paths::state_path(root).exists();
    if created {
        MirrorState::default()
            .save(root)
            .context("failed to write state")?;
    }

    let names: Vec<&str> = config.peers.iter().map(|p| p.name.as_str()).collect();
    if json {
        print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "peers": names,
            "state_created": created,
        }))?;
    } else {
        println!("Initialized {}", paths::dirmap_dir(root).display());
        if names.is_empty() {
            println!("No peers yet. Run: dirmap init --peer <name>");
        } else {
            println!("Peers: {}", names.join(", "));
        }
    }
    Ok(())
}

pub fn check(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        print_json(&warnings)?;
    } else if warnings.is_empty() {
        println!("Config OK");
    } else {
        for w in &warnings {
            let level = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("{level}: {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config has errors");
    }
    Ok(())
}
