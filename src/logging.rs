//! File logging. The terminal belongs to the dashboard, so log lines only go to a daily
//! rolling file.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Environment variable overriding `logging.level`.
pub const LOG_ENV_VAR: &str = "BOOKDASH_LOG";
pub const LOG_FILE_PREFIX: &str = "bookdash.log";

/// `<cache dir>/<app>/logs`, or `./logs` when there is no cache dir.
pub fn default_log_dir(app_name: &str) -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join(app_name).join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Directory from the CLI, then config, then the default.
pub fn resolve_log_dir(cli: Option<&Path>, config: &LoggingConfig, app_name: &str) -> PathBuf {
    cli.map(Path::to_path_buf)
        .or_else(|| config.directory.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| default_log_dir(app_name))
}

/// Filter from `BOOKDASH_LOG` when set, else from the configured level.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match std::env::var(LOG_ENV_VAR) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
            .map_err(|e| eyre!("{}='{}': {}", LOG_ENV_VAR, directives, e)),
        _ => EnvFilter::try_new(&config.level)
            .map_err(|e| eyre!("logging.level '{}': {}", config.level, e)),
    }
}

/// Install the global subscriber. Keep the returned guard alive until exit so buffered
/// lines are flushed.
pub fn init_logging(config: &LoggingConfig, dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(dir)
        .map_err(|e| eyre!("Cannot create log directory {}: {}", dir.display(), e))?;

    let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_ansi(false).with_writer(writer))
            .try_init()
    };
    result.map_err(|e| eyre!("Failed to install logger: {}", e))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_log_dir_precedence() {
        let config = LoggingConfig {
            directory: Some("/var/log/bookdash".to_string()),
            ..LoggingConfig::default()
        };
        assert_eq!(
            resolve_log_dir(Some(Path::new("/tmp/logs")), &config, "bookdash"),
            PathBuf::from("/tmp/logs")
        );
        assert_eq!(
            resolve_log_dir(None, &config, "bookdash"),
            PathBuf::from("/var/log/bookdash")
        );
        let default = resolve_log_dir(None, &LoggingConfig::default(), "bookdash");
        assert!(default.ends_with("logs"));
    }

    #[test]
    fn test_configured_level_parses() {
        let config = LoggingConfig {
            level: "bookdash=debug,warn".to_string(),
            ..LoggingConfig::default()
        };
        if std::env::var(LOG_ENV_VAR).is_err() {
            assert!(env_filter(&config).is_ok());
        }
    }
}
