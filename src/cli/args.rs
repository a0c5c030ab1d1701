//! Command-line argument parsing

use crate::registry::client::DEFAULT_DOCKER_HOST;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "registry-migrator")]
#[command(about = "Migrate container images from one registry to another")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(
        long = "file",
        short = 'f',
        default_value = "config.json",
        help = "Path to the JSON migration config"
    )]
    pub file: String,

    /// Docker engine address
    #[arg(
        long = "docker-host",
        short = 'H',
        help = "Engine address (tcp://, http:// or https://); falls back to DOCKER_HOST"
    )]
    pub docker_host: Option<String>,

    /// Skip TLS verification
    #[arg(
        long = "skip-tls",
        short = 'k',
        help = "Skip TLS certificate verification for an https engine address"
    )]
    pub skip_tls: bool,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet mode
    #[arg(long = "quiet", short = 'q', help = "Only print warnings and errors")]
    pub quiet: bool,

    /// Exit non-zero when an image fails
    #[arg(
        long = "fail-on-error",
        help = "Exit with status 1 if any image failed to migrate"
    )]
    pub fail_on_error: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse().from_env()
    }

    /// Fill unset options from environment variables
    pub fn from_env(mut self) -> Self {
        if self.docker_host.is_none() {
            self.docker_host = std::env::var("DOCKER_HOST").ok().filter(|h| !h.is_empty());
        }

        if std::env::var("REGISTRY_MIGRATOR_VERBOSE").is_ok() {
            self.verbose = true;
        }

        self
    }

    pub fn docker_host(&self) -> &str {
        self.docker_host.as_deref().unwrap_or(DEFAULT_DOCKER_HOST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_flags() {
        let args = Args::parse_from(["registry-migrator"]);

        assert_eq!(args.file, "config.json");
        assert!(!args.fail_on_error);
        assert!(args.docker_host.is_none());
    }

    #[test]
    fn explicit_host_wins() {
        let args = Args::parse_from(["registry-migrator", "-f", "images.json", "-H", "tcp://engine:2375"]);

        assert_eq!(args.file, "images.json");
        assert_eq!(args.docker_host(), "tcp://engine:2375");
    }
}
