//! Logging and tracing configuration
//!
//! Scenario reports go to stdout, so diagnostics are written to stderr
//! and optionally to a log file.

use std::path::PathBuf;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use super::paths;

const LOG_FILE_NAME: &str = "scenarios.log";

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("telemetry_scenarios=debug,warn")
        } else {
            EnvFilter::new("telemetry_scenarios=info,warn")
        }
    })
}

/// Compact stderr layer; built per subscriber stack since a layer is typed
/// by the subscriber it sits on
fn stderr_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
}

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for
/// dependencies. With `log_to_file`, a copy of every event is appended to
/// `<data dir>/logs/scenarios.log` and its path is returned.
pub fn init_cli(verbose: bool, log_to_file: bool) -> Option<PathBuf> {
    if log_to_file {
        match paths::ensure_log_dir() {
            Ok(Some(dir)) => {
                let appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
                let file_layer = fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true);

                tracing_subscriber::registry()
                    .with(default_filter(verbose))
                    .with(file_layer)
                    .with(stderr_layer())
                    .init();

                return Some(dir.join(LOG_FILE_NAME));
            }
            Ok(None) => {
                eprintln!("Warning: no data directory available for log file");
            }
            Err(e) => {
                eprintln!("Warning: Could not create log directory: {}", e);
            }
        }
    }

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(stderr_layer())
        .init();

    None
}

/// Get the path to the log file
pub fn log_file_path() -> Option<PathBuf> {
    paths::log_dir().map(|d| d.join(LOG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_cli_without_log_file() {
        assert_eq!(init_cli(true, false), None);
        tracing::debug!("subscriber installed");
    }

    #[test]
    fn test_log_file_path_is_in_log_dir() {
        if let Some(path) = log_file_path() {
            assert!(path.ends_with("logs/scenarios.log"));
        }
    }
}
