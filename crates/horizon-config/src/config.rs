//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use horizon_lifecycle::{PipelineOptions, ShutdownPolicy, ViolationPolicy};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Worker pool settings.
    pub worker: WorkerConfig,
    /// Restructure pipeline settings.
    pub lifecycle: LifecycleConfig,
    /// World tree settings.
    pub world: WorldConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Threads draining restructure units. Node processing is brief per
    /// unit, so one thread keeps up with typical cycles.
    pub threads: usize,
}

/// Restructure pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// What queued units do when they observe shutdown at entry.
    pub shutdown_policy: ShutdownPolicy,
    /// Abort or report when a unit trips a state-machine precondition.
    pub violation_policy: ViolationPolicy,
    /// Reject batches whose descriptors overlap before dispatching.
    pub validate_batches: bool,
    /// Initial capacity of the dispatcher's reused unit buffer.
    pub scratch_capacity: usize,
}

/// World tree configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of the root node's bounds in world units.
    pub root_extent: i64,
    /// Deepest subdivision level the driver will request.
    pub max_depth: u8,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log pipeline counters after every cycle.
    pub show_stats: bool,
}

// --- Default implementations ---

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { threads: 1 }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_policy: ShutdownPolicy::default(),
            violation_policy: ViolationPolicy::default(),
            validate_batches: true,
            scratch_capacity: 16384,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            root_extent: 4096,
            max_depth: 6,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            show_stats: true,
        }
    }
}

impl Config {
    /// The [`PipelineOptions`] this config describes.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            worker_threads: self.worker.threads.max(1),
            validate_batches: self.lifecycle.validate_batches,
            shutdown_policy: self.lifecycle.shutdown_policy,
            violation_policy: self.lifecycle.violation_policy,
            scratch_capacity: self.lifecycle.scratch_capacity,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::Read)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::Parse)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::Write)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::Write)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::Read)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::Parse)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
