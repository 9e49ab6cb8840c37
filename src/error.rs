//! # Error Handling
//!
//! This module defines the centralized error type for bundling. It uses the
//! `thiserror` library to describe every failure mode of a bundle run with
//! enough context to locate the offending reference or resource.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. The four bundling failure kinds are
//!   `ResourceNotFound`, `AccessDenied`, `FetchFailed` and `ReferenceNotFound`;
//!   the remaining variants cover malformed input and wrapped library errors.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Every variant is fatal to the bundle call that raised it. The underlying
//! cause (I/O error, parse error, HTTP status) is kept as the error source or
//! in a field so it can be reported once at the top level.

use thiserror::Error;

/// Main error type for bundling operations
#[derive(Error, Debug)]
pub enum Error {
    /// A referenced local file does not exist.
    #[error("File not found: \"{location}\"")]
    ResourceNotFound {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// File or network access to a resource was refused.
    #[error("Permission denied: \"{location}\": {message}")]
    AccessDenied { location: String, message: String },

    /// A remote fetch completed with a non-success outcome.
    #[error("Failed to fetch: {url}{} - {message}", status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    FetchFailed {
        url: String,
        /// HTTP status when the server answered at all
        status: Option<u16>,
        message: String,
    },

    /// A fragment path does not exist within its owning document.
    ///
    /// `walked` holds the segments that did resolve before the lookup failed.
    #[error("Reference not found: \"{reference}\" in \"{file}\" (resolved up to \"#/{walked}\")")]
    ReferenceNotFound {
        reference: String,
        walked: String,
        file: String,
    },

    /// A reference string could not be interpreted at all.
    #[error("Invalid reference \"{reference}\": {message}")]
    InvalidReference { reference: String, message: String },

    /// A loaded resource is not a valid YAML/JSON document.
    #[error("Failed to parse \"{location}\": {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// An error occurred while reading bundler options.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML error, wrapped from `serde_yaml::Error`. Raised when the
    /// bundled document cannot be rendered.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`. Raised when the
    /// bundled document cannot be rendered as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Map an I/O failure on `location` onto the bundling error kinds.
    pub fn from_io(location: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::ResourceNotFound {
                location: location.to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Error::AccessDenied {
                location: location.to_string(),
                message: err.to_string(),
            },
            _ => Error::Io(err),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
