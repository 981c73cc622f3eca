//! Engine configuration, read once at startup.

use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("../package-content/ember_config.json5");

/// Validation failure for an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The per-step decay multiplier must keep propagation shrinking.
    #[error("light_decay must be in (0, 1), got {0}")]
    InvalidDecay(f32),
    /// The propagation cutoff must be a positive fraction of full brightness.
    #[error("light_cutoff must be in (0, 1), got {0}")]
    InvalidCutoff(f32),
    /// Chunks must contain at least one tile.
    #[error("chunk_size must be at least 1, got {0}")]
    InvalidChunkSize(u32),
}

/// Static engine configuration.
///
/// Values are read once at startup; there is no dynamic reconfiguration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Worker thread count. `0` means one per logical core; `1` selects the
    /// single-threaded debug mode where tasks execute inline at submission.
    pub worker_threads: usize,
    /// Chunk dimensions in tiles (chunks are square).
    pub chunk_size: u32,
    /// Per-step light attenuation multiplier.
    pub light_decay: f32,
    /// Minimum intensity below which propagation halts.
    pub light_cutoff: f32,
    /// Whether the dependency neighbourhood is 8-connected (`true`) or
    /// 4-connected (`false`).
    pub diagonal_dependencies: bool,
}

impl EngineConfig {
    /// Loads the config file, writing the bundled default on first run.
    ///
    /// # Panics
    /// Panics if the config file exists but cannot be read or parsed, or if
    /// the default cannot be written.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn load_or_create() -> Self {
        let path = Path::new("config/ember_config.json5");

        if path.exists() {
            let config_str = fs::read_to_string(path).unwrap();
            let config: EngineConfig = serde_json5::from_str(&config_str).unwrap();
            config.validate().unwrap();
            config
        } else {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, DEFAULT_CONFIG).unwrap();
            Self::default()
        }
    }

    /// Checks that the configured values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.light_decay > 0.0 && self.light_decay < 1.0) {
            return Err(ConfigError::InvalidDecay(self.light_decay));
        }
        if !(self.light_cutoff > 0.0 && self.light_cutoff < 1.0) {
            return Err(ConfigError::InvalidCutoff(self.light_cutoff));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        Ok(())
    }

    /// Resolves `worker_threads` to an actual thread count.
    #[must_use]
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism().map_or(1, |count| count.get())
        } else {
            self.worker_threads
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            chunk_size: 32,
            light_decay: 0.5,
            light_cutoff: 0.1,
            diagonal_dependencies: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bundled_default_parses() {
        let config: EngineConfig =
            serde_json5::from_str(DEFAULT_CONFIG).expect("bundled default must parse");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.light_decay = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDecay(_))
        ));

        let mut config = EngineConfig::default();
        config.light_cutoff = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCutoff(_))
        ));

        let mut config = EngineConfig::default();
        config.chunk_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidChunkSize(0))
        ));
    }
}
