//! Structured logging for the Horizon orchestrator.
//!
//! Span-based, filterable logging via the `tracing` ecosystem: console
//! output with uptime timestamps and worker thread names, plus JSON file
//! logging in debug builds for post-mortem analysis of restructure runs.

use std::path::Path;

use horizon_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Console output carries timestamps, module paths, severity, and thread
/// names (the worker threads are named, which makes concurrent restructure
/// logs readable). `RUST_LOG` overrides everything; otherwise the config's
/// `debug.log_level` is used, falling back to `info`.
///
/// # Arguments
///
/// * `log_dir` - Optional directory for JSON log files (debug builds only)
/// * `debug_build` - Whether this is a debug build (enables file logging)
/// * `config` - Optional configuration to use for log level override
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.clone(),
        _ => "info".to_string(),
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    // In debug builds, also log to a file for post-mortem analysis.
    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join("horizon.log"))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// The filter used when neither `RUST_LOG` nor the config says otherwise.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new("info")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_is_info() {
        let filter = default_env_filter();
        assert!(format!("{}", filter).contains("info"));
    }

    #[test]
    fn test_subsystem_filter_parses() {
        let filter = EnvFilter::new("info,horizon_lifecycle=trace");
        let filter_str = format!("{}", filter);
        assert!(filter_str.contains("horizon_lifecycle=trace"));
        assert!(filter_str.contains("info"));
    }

    #[test]
    fn test_env_filter_parsing() {
        let valid_filters = [
            "info",
            "debug,horizon_worker=trace",
            "warn,horizon_lifecycle=debug,horizon_octree=trace",
            "error",
        ];

        for filter_str in &valid_filters {
            let result = EnvFilter::try_from(*filter_str);
            assert!(result.is_ok(), "Failed to parse filter: {}", filter_str);
        }

        // EnvFilter ignores malformed directives instead of failing; make
        // sure weird input at least doesn't panic.
        let _ = EnvFilter::try_from("weird=input=with=equals");
    }

    #[test]
    fn test_config_level_feeds_filter() {
        let mut config = Config::default();
        config.debug.log_level = "trace".to_string();
        let filter = EnvFilter::new(&config.debug.log_level);
        assert!(format!("{}", filter).contains("trace"));
    }

    #[test]
    fn test_log_file_path_shape() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_file_path = temp_dir.path().join("horizon.log");
        assert_eq!(log_file_path.file_name().unwrap(), "horizon.log");
    }
}
