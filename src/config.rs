use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::hashers::{DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};

pub const CONFIG_FILE: &str = "hashprop.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Algorithm name, resolved when a job starts.
    pub algorithm: String,
    pub block_size: usize,
    /// How long closing a view may wait for a running worker.
    pub teardown_timeout_ms: u64,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            algorithm: "md5".to_string(),
            block_size: DEFAULT_BLOCK_SIZE,
            teardown_timeout_ms: 200,
        }
    }
}

impl HashConfig {
    /// Reads the config at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<HashConfig> {
        if !path.exists() {
            return Ok(HashConfig::default());
        }
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: HashConfig = serde_json::from_str(&s)
            .with_context(|| format!("parsing {}", path.display()))?;
        if config.block_size == 0 || config.block_size > MAX_BLOCK_SIZE {
            bail!("block_size must be between 1 and {MAX_BLOCK_SIZE}, got {}", config.block_size);
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let s = serde_json::to_string_pretty(self)?;
        fs::write(path, s).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HashConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, HashConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{ "algorithm": "sha256" }"#).unwrap();
        let config = HashConfig::load(&path).unwrap();
        assert_eq!(config.algorithm, "sha256");
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{ "block_size": 0 }"#).unwrap();
        assert!(HashConfig::load(&path).is_err());
    }

    #[test]
    fn huge_block_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{ "block_size": 18446744073709551615 }"#).unwrap();
        assert!(HashConfig::load(&path).is_err());

        fs::write(&path, format!(r#"{{ "block_size": {MAX_BLOCK_SIZE} }}"#)).unwrap();
        assert_eq!(HashConfig::load(&path).unwrap().block_size, MAX_BLOCK_SIZE);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = HashConfig {
            teardown_timeout_ms: 5,
            ..HashConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(HashConfig::load(&path).unwrap(), config);
    }
}
