//! # Bundler Options
//!
//! This module defines the options that shape a bundle run, and parses them
//! from YAML. Every field has a default, so an empty file (or no file at all)
//! yields [`BundleOptions::default`].
//!
//! ## Example
//!
//! ```yaml
//! merge-root: components
//! allow-remote: true
//! timeout-secs: 10
//! headers:
//!   - name: Authorization
//!     value: Bearer secret
//!     host: api.example.com
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Where resolved subtrees are merged in the bundled document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeRoot {
    /// Under `components`, grouped by component category
    #[default]
    Components,
    /// At the document root, keyed by the fragment path verbatim
    Document,
}

impl std::str::FromStr for MergeRoot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "components" => Ok(MergeRoot::Components),
            "document" => Ok(MergeRoot::Document),
            other => Err(Error::Config {
                message: format!("unknown merge root '{}'", other),
                hint: Some("use 'components' or 'document'".to_string()),
            }),
        }
    }
}

/// A request header attached to remote fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    pub name: String,
    pub value: String,
    /// Only send the header to this host (all hosts when absent)
    #[serde(default)]
    pub host: Option<String>,
}

impl HeaderRule {
    /// Parse `Name: value`, optionally prefixed with `host=`.
    ///
    /// ```
    /// use oapi_bundler::config::HeaderRule;
    ///
    /// let rule = HeaderRule::parse("api.example.com=Authorization: Bearer x").unwrap();
    /// assert_eq!(rule.host.as_deref(), Some("api.example.com"));
    /// assert_eq!(rule.value, "Bearer x");
    /// ```
    pub fn parse(spec: &str) -> Result<Self> {
        let (host, header) = match spec.split_once('=') {
            Some((host, header)) if !host.contains(':') => (Some(host.trim()), header),
            _ => (None, spec),
        };
        let (name, value) = header.split_once(':').ok_or_else(|| Error::Config {
            message: format!("invalid header '{}'", spec),
            hint: Some("expected 'Name: value' or 'host=Name: value'".to_string()),
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Config {
                message: format!("invalid header '{}': empty name", spec),
                hint: None,
            });
        }

        Ok(Self {
            name: name.to_string(),
            value: value.trim().to_string(),
            host: host.filter(|h| !h.is_empty()).map(str::to_string),
        })
    }

    /// Whether the header applies to requests sent to `host`
    pub fn applies_to(&self, host: Option<&str>) -> bool {
        match (&self.host, host) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
            (Some(_), None) => false,
        }
    }
}

fn default_allow_remote() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

/// Options for one bundle run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BundleOptions {
    #[serde(default)]
    pub merge_root: MergeRoot,

    /// Allow references to remote URLs
    #[serde(default = "default_allow_remote")]
    pub allow_remote: bool,

    /// Headers attached to remote fetches
    #[serde(default)]
    pub headers: Vec<HeaderRule>,

    /// Timeout for a single remote fetch
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            merge_root: MergeRoot::default(),
            allow_remote: default_allow_remote(),
            headers: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BundleOptions {
    /// Headers that apply to a request sent to `host`, in declaration order
    pub fn headers_for(&self, host: Option<&str>) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter(|rule| rule.applies_to(host))
            .map(|rule| (rule.name.clone(), rule.value.clone()))
            .collect()
    }
}

/// Parse bundler options from a YAML string.
///
/// An empty or comment-only document yields the defaults.
pub fn parse(yaml_content: &str) -> Result<BundleOptions> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml_content).map_err(|e| Error::Config {
        message: e.to_string(),
        hint: None,
    })?;
    if value.is_null() {
        return Ok(BundleOptions::default());
    }

    serde_yaml::from_value(value).map_err(|e| Error::Config {
        message: e.to_string(),
        hint: Some("known keys: merge-root, allow-remote, headers, timeout-secs".to_string()),
    })
}

/// Parse bundler options from a YAML file path
pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<BundleOptions> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}
