//! # OpenAPI Bundler Library
//!
//! This library bundles an OpenAPI document whose `$ref` references are
//! spread over many local files and remote URLs into one self-contained
//! document. It is designed to be used by the `oapi` command-line tool but
//! can also be embedded in other applications that need a single-file view
//! of an API description.
//!
//! ## Quick Example
//!
//! ```no_run
//! use oapi_bundler::bundle::{render, Bundler};
//! use oapi_bundler::config::BundleOptions;
//!
//! let bundler = Bundler::new(BundleOptions::default()).unwrap();
//! let document = bundler.bundle("specs/openapi.yaml").unwrap();
//! println!("{}", render(&document).unwrap());
//! ```
//!
//! ## Core Concepts
//!
//! - **Locations (`path`)**: Every file or URL is identified by a canonical
//!   location key, so two spellings of the same resource are loaded once.
//! - **Loading (`loader`, `cache`)**: Documents are read through a pluggable
//!   transport, checked against an access policy, parsed once, and cached
//!   for the duration of a run.
//! - **References (`reference`, `resolver`)**: The resolver walks the tree,
//!   rewrites every reference into an internal `#/...` pointer, and collects
//!   the referenced subtrees. A per-run resolution cache deduplicates shared
//!   targets and stops cycles.
//! - **Merging (`merge`)**: Collected subtrees are written into the bundled
//!   document, under `components` by default.
//! - **Bundling (`bundle`)**: Ties the pieces together and renders the result
//!   as YAML or JSON.
//!
//! ## Execution Flow
//!
//! 1.  **Load**: Read and parse the entry document.
//! 2.  **Walk**: Resolve `components` first, then every other top-level field,
//!     then `paths`, where referenced path items are spliced in place.
//! 3.  **Merge**: Write every resolved subtree at the location its references
//!     now point to.
//! 4.  **Render**: Serialize the document.

pub mod bundle;
pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod merge;
pub mod path;
pub mod reference;
pub mod resolver;

pub use bundle::{bundle, render, render_json, render_location, Bundler, OutputFormat};
pub use config::BundleOptions;
pub use error::{Error, Result};

#[cfg(test)]
mod path_proptest;
