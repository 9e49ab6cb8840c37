//! # Content Loading
//!
//! This module loads and parses the resources that references point at. It
//! separates the *policy* of loading (caching, access checks, error mapping,
//! parsing) from the *mechanics* of reading bytes, through two traits:
//!
//! - **`Transport`**: reads a local file or fetches a URL. The default
//!   `SystemTransport` uses `std::fs` and a blocking `reqwest` client.
//!
//! - **`AccessPolicy`**: decides whether a resource may be touched at all. It
//!   is consulted once per distinct resource, right before its first access.
//!
//! Tests swap in in-memory implementations of both to simulate files,
//! servers and refusals without touching the filesystem or the network.

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use log::{debug, info, trace};
use serde_yaml::Value as YamlValue;
use url::Url;

use crate::cache::DocumentCache;
use crate::config::BundleOptions;
use crate::error::{Error, Result};
use crate::path::Location;

/// Reads raw content for a location
pub trait Transport {
    /// Read a local file as text.
    fn read_file(&self, path: &Path) -> std::io::Result<String>;

    /// Fetch a URL as text, sending the given request headers.
    ///
    /// A completed request with a non-success status must surface as
    /// `Error::FetchFailed`.
    fn fetch(&self, url: &Url, headers: &[(String, String)]) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for Rc<T> {
    fn read_file(&self, path: &Path) -> std::io::Result<String> {
        (**self).read_file(path)
    }

    fn fetch(&self, url: &Url, headers: &[(String, String)]) -> Result<String> {
        (**self).fetch(url, headers)
    }
}

/// Grants or refuses access to a resource before it is first read
pub trait AccessPolicy {
    fn check(&self, location: &Location) -> Result<()>;
}

/// Policy allowing every local and remote resource
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn check(&self, _location: &Location) -> Result<()> {
        Ok(())
    }
}

/// Policy refusing every remote resource
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalOnly;

impl AccessPolicy for LocalOnly {
    fn check(&self, location: &Location) -> Result<()> {
        if location.is_remote() {
            return Err(Error::AccessDenied {
                location: location.key.clone(),
                message: "remote references are disabled".to_string(),
            });
        }
        Ok(())
    }
}

/// The default transport, backed by the local filesystem and HTTP(S)
pub struct SystemTransport {
    client: reqwest::blocking::Client,
}

impl SystemTransport {
    /// Create a transport whose remote fetches time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(format!("oapi/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to create HTTP client: {}", e),
                hint: None,
            })?;
        Ok(Self { client })
    }
}

impl Transport for SystemTransport {
    fn read_file(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn fetch(&self, url: &Url, headers: &[(String, String)]) -> Result<String> {
        let mut request = self.client.get(url.as_str());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().map_err(|e| Error::FetchFailed {
            url: url.to_string(),
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().map_err(|e| Error::FetchFailed {
            url: url.to_string(),
            status: Some(status.as_u16()),
            message: format!("Failed to read response: {}", e),
        })?;

        if !status.is_success() {
            return Err(Error::FetchFailed {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: body,
            });
        }
        Ok(body)
    }
}

/// Loads parsed documents by location, at most once each per run
pub struct ContentLoader<'a> {
    transport: &'a dyn Transport,
    policy: &'a dyn AccessPolicy,
    options: &'a BundleOptions,
    cache: DocumentCache,
}

impl<'a> ContentLoader<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        policy: &'a dyn AccessPolicy,
        options: &'a BundleOptions,
    ) -> Self {
        Self {
            transport,
            policy,
            options,
            cache: DocumentCache::new(),
        }
    }

    /// Load the document at `location`.
    ///
    /// On a cache hit the parsed document is returned without I/O. On a miss
    /// the access policy is consulted, the content is read or fetched,
    /// parsed, and cached under the location key.
    pub fn load(&mut self, location: &Location) -> Result<Rc<YamlValue>> {
        if self.cache.contains(&location.key) {
            debug!("Document cache hit: {}", location.key);
        }
        let (transport, policy, options) = (self.transport, self.policy, self.options);
        self.cache.get_or_load(&location.key, || {
            policy.check(location)?;
            let content = read(transport, options, location)?;
            trace!("Content: {}", content);
            parse_document(&location.key, &content)
        })
    }

    /// Number of distinct documents loaded so far
    pub fn loaded(&self) -> usize {
        self.cache.len()
    }
}

fn read(transport: &dyn Transport, options: &BundleOptions, location: &Location) -> Result<String> {
    if location.is_remote() {
        let url = Url::parse(&location.key)?;
        info!("Load remote ref: {}", url);
        let headers = options.headers_for(url.host_str());
        transport.fetch(&url, &headers)
    } else {
        info!("Load local ref: {}", location.key);
        transport
            .read_file(Path::new(&location.key))
            .map_err(|e| Error::from_io(&location.key, e))
    }
}

/// Parse YAML (or JSON) text into a document tree.
pub fn parse_document(location: &str, content: &str) -> Result<YamlValue> {
    serde_yaml::from_str(content).map_err(|source| Error::Parse {
        location: location.to_string(),
        source,
    })
}
