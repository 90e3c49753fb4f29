//! Tracing subscriber setup
//!
//! `--verbose` forces debug; otherwise `RUST_LOG` wins over the configured
//! level. Logs go to stderr so that dashboard output on stdout stays clean.

use crate::config::LoggingConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive for the configured level, bumped to debug by `--verbose`.
#[must_use]
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose { "debug" } else { config.level.as_str() };
    format!("warn,clima={level}")
}

/// Directives to install, given the value of `RUST_LOG` (if any)
fn effective_directive(config: &LoggingConfig, verbose: bool, rust_log: Option<String>) -> String {
    match rust_log {
        Some(directive) if !verbose && !directive.trim().is_empty() => directive,
        _ => filter_directive(config, verbose),
    }
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init(config: &LoggingConfig, verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = EnvFilter::try_new(effective_directive(config, verbose, rust_log))
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config, verbose)));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(format = %config.format, "Logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        let config = LoggingConfig::default();
        assert_eq!(filter_directive(&config, false), "warn,clima=info");
        assert_eq!(filter_directive(&config, true), "warn,clima=debug");
    }

    #[test]
    fn test_rust_log_overrides_config_but_not_verbose() {
        let config = LoggingConfig::default();
        let rust_log = || Some("error".to_string());

        assert_eq!(effective_directive(&config, false, rust_log()), "error");
        assert_eq!(effective_directive(&config, true, rust_log()), "warn,clima=debug");
        assert_eq!(effective_directive(&config, false, None), "warn,clima=info");
        assert_eq!(effective_directive(&config, false, Some(" ".to_string())), "warn,clima=info");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        let config = LoggingConfig::default();
        init(&config, false);
        init(&config, true);
    }
}
