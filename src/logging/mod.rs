//! Logging setup and output formatting helpers
//!
//! All user-visible output goes through `tracing`. [`init`] installs the
//! subscriber, mapping the `--verbose` and `--quiet` switches to a default
//! filter; `RUST_LOG` overrides both.

use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter directive for the given verbosity switches
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "registry_migrator=warn"
    } else if verbose {
        "registry_migrator=debug"
    } else {
        "registry_migrator=info"
    }
}

/// Install the global subscriber. Calling it twice is harmless; the second
/// call leaves the first subscriber in place.
pub fn init(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(verbose, quiet).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h2m5s");
    }

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(default_directive(true, true), "registry_migrator=warn");
        assert_eq!(default_directive(true, false), "registry_migrator=debug");
        assert_eq!(default_directive(false, false), "registry_migrator=info");
    }
}
