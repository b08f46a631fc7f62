use crate::error::{DirMapError, Result};
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DriverConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Attempts per action before the sequence is abandoned.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub retry_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: 0,
        }
    }
}

impl DriverConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// PeerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub name: String,
    /// Offline peers refuse acquire requests.
    #[serde(default)]
    pub offline: bool,
}

static PEER_RE: OnceLock<Regex> = OnceLock::new();

fn peer_re() -> &'static Regex {
    PEER_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-]*$").unwrap())
}

pub fn validate_peer_name(name: &str) -> Result<()> {
    if name.len() > 64 || !peer_re().is_match(name) {
        return Err(DirMapError::InvalidPeer {
            peer: name.to_string(),
            reason: "must be alphanumeric with '.', '_' or '-'".to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    #[serde(default)]
    pub driver: DriverConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            peers: Vec::new(),
            driver: DriverConfig::default(),
        }
    }
}

impl Config {
    pub fn with_peers<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cfg = Self::default();
        for name in names {
            cfg.add_peer(name)?;
        }
        Ok(cfg)
    }

    pub fn load(root: &Path) -> Result<Self> {
        crate::io::load_yaml(&paths::config_path(root))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::save_yaml(&paths::config_path(root), self)
    }

    /// Add a peer; adding a known peer is a no-op.
    pub fn add_peer(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_peer_name(&name)?;
        if self.peer(&name).is_none() {
            self.peers.push(PeerConfig {
                name,
                offline: false,
            });
        }
        Ok(())
    }

    pub fn peer(&self, name: &str) -> Option<&PeerConfig> {
        self.peers.iter().find(|p| p.name == name)
    }

    pub fn is_online(&self, name: &str) -> bool {
        self.peer(name).map(|p| !p.offline).unwrap_or(false)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.peers.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no peers configured; nothing can acquire directories".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for peer in &self.peers {
            if !seen.insert(peer.name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("peer '{}' is listed more than once", peer.name),
                });
            }
            if validate_peer_name(&peer.name).is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("peer name '{}' is not valid", peer.name),
                });
            }
        }

        if self.driver.max_attempts == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "driver.max_attempts is 0; actions would never run".to_string(),
            });
        } else if self.driver.max_attempts > 10 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "driver.max_attempts={} (>10 is unusual)",
                    self.driver.max_attempts
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::with_peers(["mirror-a", "mirror-b"]).unwrap();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.peers.len(), 2);
        assert_eq!(parsed.driver, DriverConfig::default());
    }

    #[test]
    fn sparse_yaml_fills_defaults() {
        let cfg: Config = serde_yaml::from_str("peers:\n  - name: a\n    offline: true\n").unwrap();
        assert_eq!(cfg.driver.max_attempts, 3);
        assert!(!cfg.is_online("a"));
        assert!(!cfg.is_online("missing"));
    }

    #[test]
    fn load_save() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(DirMapError::NotInitialized)
        ));
        let cfg = Config::with_peers(["a"]).unwrap();
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert!(loaded.is_online("a"));
    }

    #[test]
    fn add_peer_is_idempotent() {
        let mut cfg = Config::default();
        cfg.add_peer("a").unwrap();
        cfg.add_peer("a").unwrap();
        assert_eq!(cfg.peers.len(), 1);
        assert!(cfg.add_peer("bad name").is_err());
        assert!(cfg.add_peer("-dash").is_err());
    }

    #[test]
    fn validate_flags_problems() {
        let mut cfg = Config::default();
        cfg.driver.max_attempts = 0;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.level == WarnLevel::Error));

        let mut cfg = Config::with_peers(["a"]).unwrap();
        cfg.peers.push(PeerConfig {
            name: "a".to_string(),
            offline: false,
        });
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("more than once"));
    }

    #[test]
    fn clean_config_has_no_warnings() {
        let cfg = Config::with_peers(["a", "b"]).unwrap();
        assert!(cfg.validate().is_empty());
    }
}
