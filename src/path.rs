//! Location resolution for reference targets
//!
//! Every loadable resource is identified by a *location key*: an absolute URL
//! for remote targets, or a lexically normalized `/`-separated path for local
//! ones. Two spellings of the same resource (`./a/../b.yaml` and `b.yaml`)
//! always produce the same key, which is what the document and resolution
//! caches rely on.

use url::Url;

use crate::error::{Error, Result};

/// The canonical identity of a reference target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Location key of the resource (URL or normalized path)
    pub key: String,
    /// Fragment after `#`, `None` when the whole document is addressed
    pub fragment: Option<String>,
    /// Directory context for relative references inside the target.
    ///
    /// Relative to the bundle base for local targets, an absolute URL
    /// ending in `/` for remote ones.
    pub directory: String,
}

impl Location {
    /// Whether the location is fetched over the network
    pub fn is_remote(&self) -> bool {
        is_remote(&self.key)
    }

    /// File name of the target without its extension.
    pub fn stem(&self) -> String {
        file_stem(&self.key)
    }
}

/// File name of a location key without its extension, query or fragment.
pub fn file_stem(key: &str) -> String {
    let without_query = key.split(['?', '#']).next().unwrap_or_default();
    let name = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[..idx].to_string(),
        _ => name.to_string(),
    }
}

/// Check whether a reference target or directory is an absolute HTTP(S) URL
pub fn is_remote(target: &str) -> bool {
    match Url::parse(target) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Split a reference target on its first `#`.
///
/// An empty fragment, or a bare `/`, addresses the whole document and is
/// returned as `None`.
pub fn split_reference(target: &str) -> (&str, Option<&str>) {
    match target.split_once('#') {
        Some((path, fragment)) if fragment.is_empty() || fragment == "/" => (path, None),
        Some((path, fragment)) => (path, Some(fragment)),
        None => (target, None),
    }
}

/// Lexically normalize a `/`-separated path.
///
/// `.` segments and empty segments are dropped and `..` collapses the
/// previous segment. Leading `..` segments of a relative path are kept. The
/// filesystem is never consulted.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Join path pieces with `/` and normalize the result.
///
/// A piece starting with `/` discards everything before it.
pub fn join(pieces: &[&str]) -> String {
    let mut combined = String::new();
    for piece in pieces.iter().filter(|p| !p.is_empty()) {
        if piece.starts_with('/') || combined.is_empty() {
            combined = piece.to_string();
        } else {
            combined.push('/');
            combined.push_str(piece);
        }
    }
    normalize(&combined)
}

/// Parse `dir` as a URL that is guaranteed to act as a directory when joined.
fn directory_url(dir: &str) -> Result<Url> {
    let mut url = Url::parse(dir)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Resolve a reference target into its canonical [`Location`].
///
/// * `target` - the reference string, e.g. `../c/d.yaml#/foo`
/// * `base` - the bundle base directory (directory of the entry file)
/// * `current` - directory of the file holding the reference, relative to
///   `base`, or an absolute URL when the file was fetched remotely
///
/// Absolute URL targets are taken as-is. When `current` or `base` is a URL,
/// the target is joined with standard URL resolution, with `current`
/// injected as an intermediate directory. Otherwise the location key is the
/// normalized join of `base`, `current` and the target path.
pub fn resolve(target: &str, base: &str, current: &str) -> Result<Location> {
    let (path, fragment) = split_reference(target);
    if path.is_empty() {
        return Err(Error::InvalidReference {
            reference: target.to_string(),
            message: "internal references have no location".to_string(),
        });
    }
    let fragment = fragment.map(str::to_string);

    let remote = if is_remote(path) {
        Some(Url::parse(path)?)
    } else if is_remote(current) {
        Some(directory_url(current)?.join(path)?)
    } else if is_remote(base) {
        let mut dir = directory_url(base)?;
        if !current.is_empty() && current != "." {
            dir = dir.join(&format!("{}/", current.trim_end_matches('/')))?;
        }
        Some(dir.join(path)?)
    } else {
        None
    };

    if let Some(mut url) = remote {
        url.set_fragment(None);
        let directory = url.join("./")?.to_string();
        return Ok(Location {
            key: url.to_string(),
            fragment,
            directory,
        });
    }

    let relative = join(&[current, path]);
    let directory = match relative.rsplit_once('/') {
        Some(("", _)) => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    };

    Ok(Location {
        key: join(&[base, &relative]),
        fragment,
        directory,
    })
}
