//! Configuration for the GameShelf store core

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default storage origin directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gameshelf")
}

/// Artificial latency applied to ledger operations, in milliseconds.
///
/// Models network-call semantics over a local medium. Values are
/// non-normative and callers must not depend on relative ordering between
/// differently-delayed operations. Tests zero them out with [`LatencyProfile::zero`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyProfile {
    /// Login, signup and provider lookups
    #[serde(default = "default_credential_check_ms")]
    pub credential_check_ms: u64,

    /// Profile fetch by id (token resolution)
    #[serde(default = "default_profile_fetch_ms")]
    pub profile_fetch_ms: u64,

    /// Favorites reads
    #[serde(default = "default_favorites_read_ms")]
    pub favorites_read_ms: u64,

    /// Review reads and all ledger mutations
    #[serde(default = "default_ledger_op_ms")]
    pub ledger_op_ms: u64,
}

fn default_credential_check_ms() -> u64 {
    500
}

fn default_profile_fetch_ms() -> u64 {
    150
}

fn default_favorites_read_ms() -> u64 {
    100
}

fn default_ledger_op_ms() -> u64 {
    300
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            credential_check_ms: default_credential_check_ms(),
            profile_fetch_ms: default_profile_fetch_ms(),
            favorites_read_ms: default_favorites_read_ms(),
            ledger_op_ms: default_ledger_op_ms(),
        }
    }
}

impl LatencyProfile {
    /// No artificial delays (for tests)
    pub fn zero() -> Self {
        Self {
            credential_check_ms: 0,
            profile_fetch_ms: 0,
            favorites_read_ms: 0,
            ledger_op_ms: 0,
        }
    }
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage origin directory; every document lives inside it
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Artificial latency per operation class
    #[serde(default)]
    pub latency: LatencyProfile,

    /// Change-broadcast channel capacity
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Seed first-run demo data (users, reviews, favorites)
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,

    /// HMAC secret for session tokens (at least 32 characters)
    #[serde(default = "default_session_secret")]
    pub session_secret: String,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_true() -> bool {
    true
}

fn default_session_secret() -> String {
    // Development fallback; deployments override via config file
    "gameshelf-dev-secret-not-for-production-0123".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            latency: LatencyProfile::default(),
            channel_capacity: default_channel_capacity(),
            seed_demo_data: true,
            session_secret: default_session_secret(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get config file path inside the origin directory
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    /// Test configuration: throwaway directory, no delays, no demo data
    pub fn for_test<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            data_dir: dir.as_ref().to_path_buf(),
            latency: LatencyProfile::zero(),
            channel_capacity: default_channel_capacity(),
            seed_demo_data: false,
            session_secret: default_session_secret(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.seed_demo_data);
        assert_eq!(config.latency.credential_check_ms, 500);
        assert_eq!(config.latency.favorites_read_ms, 100);
        assert!(config.session_secret.len() >= 32);
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.latency.ledger_op_ms = 42;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.latency.ledger_op_ms, 42);
        assert_eq!(loaded.channel_capacity, config.channel_capacity);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "seed_demo_data = false\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert!(!loaded.seed_demo_data);
        assert_eq!(loaded.latency.profile_fetch_ms, 150);
    }
}
