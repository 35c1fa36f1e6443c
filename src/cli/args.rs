//! Command-line argument parsing

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "registry-transfer")]
#[command(about = "Transfer container images between OCI-compatible registries")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(
        long = "config",
        short = 'c',
        help = "Path to the JSON configuration file"
    )]
    pub config: Option<String>,

    /// Number of workers per pool
    #[arg(
        long = "routines",
        short = 'j',
        help = "Number of concurrent workers per pool (overrides the config file)"
    )]
    pub routines: Option<usize>,

    /// Retry rounds for failed work
    #[arg(
        long = "retries",
        help = "Maximum retry rounds for failed expansions and jobs"
    )]
    pub retries: Option<usize>,

    /// Fallback target registry
    #[arg(
        long = "default-registry",
        help = "Target registry used when a rule has no target"
    )]
    pub default_registry: Option<String>,

    /// Fallback target namespace
    #[arg(
        long = "default-namespace",
        help = "Target namespace used when a rule has no target"
    )]
    pub default_namespace: Option<String>,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet output
    #[arg(long = "quiet", short = 'q', help = "Suppress all non-error output")]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.config {
            if !std::path::Path::new(path).exists() {
                return Err(format!("Config file does not exist: {}", path));
            }
        }
        if self.routines == Some(0) {
            return Err("Routines must be greater than 0".to_string());
        }
        if self.verbose && self.quiet {
            return Err("--verbose and --quiet are mutually exclusive".to_string());
        }
        Ok(())
    }
}
