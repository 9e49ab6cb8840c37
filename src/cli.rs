//! CLI argument parsing, logging setup and command dispatch

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// Environment variable selecting verbosity (0-3, true or false)
pub const VERBOSE_ENV: &str = "OAPI_VERBOSE";

/// oapi - Bundle multi-file OpenAPI documents into one
#[derive(Parser, Debug)]
#[command(name = "oapi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Set log level (error, warn, info, debug, trace), overriding -v
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bundle an OpenAPI document and everything it references
    Bundle(commands::bundle::BundleArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let env = std::env::var(VERBOSE_ENV).ok();
        let level = self.level(env.as_deref())?;
        // A logger installed by a host process wins
        let _ = env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .parse_default_env()
            .try_init();

        match self.command {
            Commands::Bundle(args) => commands::bundle::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }

    /// Log level from `--log-level`, then `-v` flags, then the verbosity variable.
    fn level(&self, env_verbosity: Option<&str>) -> Result<LevelFilter> {
        if let Some(level) = &self.log_level {
            return level
                .parse::<LevelFilter>()
                .map_err(|_| anyhow!("Invalid log level '{}'", level));
        }
        if self.verbose > 0 {
            return Ok(level_for(self.verbose));
        }
        let verbosity = env_verbosity.and_then(parse_verbosity).unwrap_or(0);
        Ok(level_for(verbosity))
    }
}

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Parse a verbosity value: a number (clamped to 3), `true` or `false`.
fn parse_verbosity(value: &str) -> Option<u8> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(1),
        "false" | "" => Some(0),
        other => other.parse::<u8>().ok().map(|v| v.min(3)),
    }
}
