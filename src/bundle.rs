//! # Bundling
//!
//! The [`Bundler`] turns an entry document and everything it references into
//! a single self-contained document. A run:
//!
//! 1. loads the entry document through a fresh [`ContentLoader`],
//! 2. walks `components` first, then every other top-level field, then
//!    `paths` (where referenced path items are spliced in place),
//! 3. writes every resolved subtree into the document at the location its
//!    references were rewritten to.
//!
//! Caches live for exactly one [`Bundler::bundle`] call, so bundling the
//! same entry twice always reflects the current state of its files.

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use clap::ValueEnum;
use log::{debug, info};
use serde_yaml::Value as YamlValue;

use crate::config::BundleOptions;
use crate::error::Result;
use crate::loader::{AccessPolicy, AllowAll, ContentLoader, LocalOnly, SystemTransport, Transport};
use crate::path::{is_remote, resolve};
use crate::resolver::{Context, RefResolver};

/// Serialization format of the bundled document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Bundles OpenAPI documents spread over several files or URLs
pub struct Bundler {
    options: BundleOptions,
    transport: Box<dyn Transport>,
    policy: Box<dyn AccessPolicy>,
}

impl Bundler {
    /// Create a bundler reading from disk and HTTP(S).
    ///
    /// Remote locations are refused when `options.allow_remote` is off.
    pub fn new(options: BundleOptions) -> Result<Self> {
        let transport = SystemTransport::new(Duration::from_secs(options.timeout_secs))?;
        let policy: Box<dyn AccessPolicy> = if options.allow_remote {
            Box::new(AllowAll)
        } else {
            Box::new(LocalOnly)
        };
        Ok(Self {
            options,
            transport: Box::new(transport),
            policy,
        })
    }

    /// Replace the transport used to read files and fetch URLs.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    /// Replace the access policy consulted before each resource is read.
    pub fn with_access_policy(mut self, policy: impl AccessPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn options(&self) -> &BundleOptions {
        &self.options
    }

    /// Bundle the document at `entry`, a file path or an HTTP(S) URL.
    ///
    /// # Errors
    ///
    /// Any failure to load a resource or to find a referenced fragment
    /// aborts the run. No partial document is returned.
    pub fn bundle(&self, entry: &str) -> Result<YamlValue> {
        let (base, file) = split_entry(entry);
        let location = resolve(&file, &base, "")?;
        info!("Bundling {}", location.key);

        let mut loader = ContentLoader::new(self.transport.as_ref(), self.policy.as_ref(), &self.options);
        let root = loader.load(&location)?;
        let mut document = (*root).clone();
        let ctx = Context::root(&location, Rc::clone(&root));

        let mut resolver = RefResolver::new(&self.options, &mut loader, &base, &ctx);
        let mut fields: Vec<YamlValue> = document
            .as_mapping()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        if !document.is_mapping() {
            resolver.walk(&mut document, &ctx)?;
        }
        fields.sort_by_key(|field| match field.as_str() {
            Some("components") => 0,
            Some("paths") => 2,
            _ => 1,
        });

        for field in fields {
            let Some(value) = document.get_mut(&field) else {
                continue;
            };
            match field.as_str() {
                Some("components") => resolver.resolve_components(value, &ctx.descend("components"))?,
                Some("paths") => resolver.resolve_paths(value, &ctx.descend("paths"))?,
                Some(name) => resolver.walk(value, &ctx.descend(name))?,
                None => resolver.walk(value, &ctx)?,
            }
        }

        let resolved = resolver.resolved();
        let merged = resolver.finish();
        debug!("Merging {} resolved subtrees", merged.len());
        merged.materialize(&mut document)?;

        info!(
            "Bundled {} ({} documents loaded, {} references resolved)",
            location.key,
            loader.loaded(),
            resolved
        );
        Ok(document)
    }
}

/// Split an entry into the bundle base and the entry file relative to it.
///
/// Remote entries are absolute already and have no base.
fn split_entry(entry: &str) -> (String, String) {
    if is_remote(entry) {
        return (String::new(), entry.to_string());
    }

    let path = Path::new(entry);
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| entry.to_string());
    let base = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().to_string(),
        _ => ".".to_string(),
    };
    (base, file)
}

/// Bundle `entry` with default options.
pub fn bundle(entry: &str) -> Result<YamlValue> {
    Bundler::new(BundleOptions::default())?.bundle(entry)
}

/// Serialize a bundled document as YAML.
pub fn render(document: &YamlValue) -> Result<String> {
    Ok(serde_yaml::to_string(document)?)
}

/// Serialize a bundled document as pretty-printed JSON.
pub fn render_json(document: &YamlValue) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Serialize a bundled document in `format`.
pub fn render_as(document: &YamlValue, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => render(document),
        OutputFormat::Json => render_json(document),
    }
}

/// Bundle `entry` and serialize the result as YAML.
pub fn render_location(entry: &str, options: &BundleOptions) -> Result<String> {
    let document = Bundler::new(options.clone())?.bundle(entry)?;
    render(&document)
}
