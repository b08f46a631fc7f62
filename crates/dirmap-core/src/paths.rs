use crate::error::{DirMapError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const DIRMAP_DIR: &str = ".dirmap";
pub const CONFIG_FILE: &str = ".dirmap/config.yaml";
pub const STATE_FILE: &str = ".dirmap/state.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn dirmap_dir(root: &Path) -> PathBuf {
    root.join(DIRMAP_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

// ---------------------------------------------------------------------------
// Mirrored directory validation
// ---------------------------------------------------------------------------

/// Mirrored directories are named by their absolute path inside the
/// filesystem, e.g. `/volumes/group/share`.
pub fn validate_directory(path: &str) -> Result<()> {
    let invalid = || DirMapError::InvalidPath(path.to_string());
    if path == "/" {
        return Ok(());
    }
    let rest = path.strip_prefix('/').ok_or_else(invalid)?;
    if rest
        .split('/')
        .any(|c| c.is_empty() || c == "." || c == "..")
    {
        return Err(invalid());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
