//! Bundle command implementation
//!
//! Loads the entry document, resolves every reference it reaches, and writes
//! the bundled document to stdout or a file. Nothing is written when the run
//! fails.

use anyhow::{bail, Context, Result};
use clap::Args;
use log::info;
use std::io::Write;
use std::path::PathBuf;

use oapi_bundler::bundle::{render_as, Bundler, OutputFormat};
use oapi_bundler::config::{self, BundleOptions, HeaderRule, MergeRoot};

/// Arguments for the bundle command
#[derive(Args, Debug)]
pub struct BundleArgs {
    /// Entry document, a file path or an HTTP(S) URL
    #[arg(value_name = "FILE|URL")]
    pub entry: String,

    /// Write the bundle to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Path to a bundler options file
    #[arg(short, long, value_name = "PATH", env = "OAPI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Header sent with every remote fetch ('Name: value')
    #[arg(long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Header sent to one host only ('host=Name: value')
    #[arg(long = "host-header", value_name = "RULE")]
    pub host_headers: Vec<String>,

    /// Refuse references to remote URLs
    #[arg(long)]
    pub no_remote: bool,

    /// Where resolved references are merged (components, document)
    #[arg(long, value_name = "ROOT")]
    pub merge_root: Option<MergeRoot>,

    /// Timeout for each remote fetch, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Execute the bundle command
pub fn execute(args: BundleArgs) -> Result<()> {
    let options = options_from(&args)?;
    let bundler = Bundler::new(options)?;
    let document = bundler
        .bundle(&args.entry)
        .with_context(|| format!("Failed to bundle {}", args.entry))?;

    let mut rendered = render_as(&document, args.format)?;
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Build bundler options: the options file first, then command-line flags.
fn options_from(args: &BundleArgs) -> Result<BundleOptions> {
    let mut options = match &args.config {
        Some(path) => config::from_file(path)
            .with_context(|| format!("Failed to read options from {}", path.display()))?,
        None => BundleOptions::default(),
    };

    if let Some(merge_root) = args.merge_root {
        options.merge_root = merge_root;
    }
    if args.no_remote {
        options.allow_remote = false;
    }
    if let Some(timeout) = args.timeout {
        options.timeout_secs = timeout;
    }

    for header in &args.headers {
        let rule = HeaderRule::parse(header)?;
        if rule.host.is_some() {
            bail!("Header '{}' names a host, use --host-header instead", header);
        }
        options.headers.push(rule);
    }
    for header in &args.host_headers {
        let rule = HeaderRule::parse(header)?;
        if rule.host.is_none() {
            bail!("Host header '{}' must look like 'host=Name: value'", header);
        }
        options.headers.push(rule);
    }

    Ok(options)
}
