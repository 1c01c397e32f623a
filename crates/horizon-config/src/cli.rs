//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;
use horizon_lifecycle::{ShutdownPolicy, ViolationPolicy};

use crate::Config;

/// Horizon orchestrator command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "horizon", about = "Octree node-lifecycle orchestrator")]
pub struct CliArgs {
    /// Worker threads for restructure units.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Validate batch disjointness before dispatch.
    #[arg(long)]
    pub validate_batches: Option<bool>,

    /// Shutdown policy: "complete" or "discard".
    #[arg(long)]
    pub shutdown_policy: Option<String>,

    /// Violation policy: "abort" or "report".
    #[arg(long)]
    pub violation_policy: Option<String>,

    /// Edge length of the root node's bounds.
    #[arg(long)]
    pub root_extent: Option<i64>,

    /// Deepest subdivision level the driver will request.
    #[arg(long)]
    pub max_depth: Option<u8>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log pipeline counters after every cycle.
    #[arg(long)]
    pub show_stats: Option<bool>,

    /// Divide/group cycles the demo driver runs.
    #[arg(long)]
    pub cycles: Option<u32>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    ///
    /// Unrecognized policy names are logged and ignored rather than
    /// clobbering the configured value.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(threads) = args.threads {
            self.worker.threads = threads;
        }
        if let Some(validate) = args.validate_batches {
            self.lifecycle.validate_batches = validate;
        }
        if let Some(ref policy) = args.shutdown_policy {
            match policy.as_str() {
                "complete" | "complete-pending" => {
                    self.lifecycle.shutdown_policy = ShutdownPolicy::CompletePending;
                }
                "discard" | "discard-pending" => {
                    self.lifecycle.shutdown_policy = ShutdownPolicy::DiscardPending;
                }
                other => log::warn!("Unknown shutdown policy {other:?}, keeping config value"),
            }
        }
        if let Some(ref policy) = args.violation_policy {
            match policy.as_str() {
                "abort" => self.lifecycle.violation_policy = ViolationPolicy::Abort,
                "report" => self.lifecycle.violation_policy = ViolationPolicy::Report,
                other => log::warn!("Unknown violation policy {other:?}, keeping config value"),
            }
        }
        if let Some(extent) = args.root_extent {
            self.world.root_extent = extent;
        }
        if let Some(depth) = args.max_depth {
            self.world.max_depth = depth;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(show) = args.show_stats {
            self.debug.show_stats = show;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs {
            threads: None,
            validate_batches: None,
            shutdown_policy: None,
            violation_policy: None,
            root_extent: None,
            max_depth: None,
            log_level: None,
            show_stats: None,
            cycles: None,
            config: None,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let mut args = empty_args();
        args.threads = Some(4);
        args.shutdown_policy = Some("discard".to_string());
        args.violation_policy = Some("report".to_string());
        args.log_level = Some("debug".to_string());

        config.apply_cli_overrides(&args);
        assert_eq!(config.worker.threads, 4);
        assert_eq!(
            config.lifecycle.shutdown_policy,
            ShutdownPolicy::DiscardPending
        );
        assert_eq!(config.lifecycle.violation_policy, ViolationPolicy::Report);
        assert_eq!(config.debug.log_level, "debug");
        // Non-overridden fields retain defaults.
        assert_eq!(config.world.root_extent, 4096);
        assert!(config.lifecycle.validate_batches);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&empty_args());
        assert_eq!(config, original);
    }

    #[test]
    fn test_unknown_policy_is_ignored() {
        let mut config = Config::default();
        let mut args = empty_args();
        args.shutdown_policy = Some("sideways".to_string());
        args.violation_policy = Some("shrug".to_string());

        config.apply_cli_overrides(&args);
        assert_eq!(
            config.lifecycle.shutdown_policy,
            ShutdownPolicy::CompletePending
        );
        assert_eq!(config.lifecycle.violation_policy, ViolationPolicy::Abort);
    }
}
