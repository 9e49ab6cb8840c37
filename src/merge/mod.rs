//! Fragment paths and merging into the bundled document
//!
//! A fragment is the `/`-delimited path after the `#` of a reference. This
//! module turns fragments into segment lists (decoding the `~1`/`~0` escapes
//! of JSON pointers) and back into internal pointers of the form `#/a/b`.
//! The [`yaml`] submodule walks and merges YAML trees along those segments.

pub mod yaml;

use std::collections::HashMap;

use serde_yaml::Value as YamlValue;

use crate::cache::RefKey;
use crate::error::{Error, Result};
use crate::reference::target_of;

/// Resolved subtrees waiting to be written into the bundled document
///
/// Every entry is keyed by the `(location, fragment)` pair it was resolved
/// from. Each key claims one placement, and a placement belongs to exactly
/// one key, so two different targets are never merged into the same slot.
/// Entries are written in the order their resolution completed.
#[derive(Debug, Default)]
pub struct MergedTree {
    order: Vec<RefKey>,
    values: HashMap<RefKey, YamlValue>,
    placements: HashMap<RefKey, Vec<String>>,
    owners: HashMap<Vec<String>, RefKey>,
}

impl MergedTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a placement for `key` and return the one it was given.
    ///
    /// A key keeps the placement it claimed first. When `placement` already
    /// belongs to another key, or `occupied` reports content there, the last
    /// segment is suffixed with `stem` and then with a counter until a free
    /// placement is found.
    pub fn claim<F>(
        &mut self,
        key: &RefKey,
        placement: Vec<String>,
        stem: &str,
        occupied: F,
    ) -> Vec<String>
    where
        F: Fn(&[String]) -> bool,
    {
        if let Some(existing) = self.placements.get(key) {
            return existing.clone();
        }

        let mut chosen = placement.clone();
        if !self.is_free(&chosen, &occupied) {
            if let Some((last, parent)) = placement.split_last() {
                let renamed = |suffix: &dyn std::fmt::Display| {
                    let mut candidate = parent.to_vec();
                    candidate.push(format!("{}_{}", last, suffix));
                    candidate
                };
                let mut candidates = (last != stem)
                    .then(|| renamed(&stem))
                    .into_iter()
                    .chain((2u32..).map(|n| renamed(&n)));
                chosen = candidates
                    .find(|candidate| self.is_free(candidate, &occupied))
                    .unwrap_or(chosen);
            }
        }

        self.owners.insert(chosen.clone(), key.clone());
        self.placements.insert(key.clone(), chosen.clone());
        chosen
    }

    fn is_free(&self, placement: &[String], occupied: &dyn Fn(&[String]) -> bool) -> bool {
        !self.owners.contains_key(placement) && !occupied(placement)
    }

    /// Claim `placement` for `key` unconditionally.
    ///
    /// Used for slots named by the entry document itself, which no other
    /// key can have claimed.
    pub fn claim_slot(&mut self, key: &RefKey, placement: Vec<String>) -> Vec<String> {
        self.owners.insert(placement.clone(), key.clone());
        self.placements.insert(key.clone(), placement.clone());
        placement
    }

    /// Store the walked subtree of a claimed key.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidReference` if `key` never claimed a placement.
    pub fn insert(&mut self, key: RefKey, value: YamlValue) -> Result<()> {
        if !self.placements.contains_key(&key) {
            return Err(Error::InvalidReference {
                reference: key.to_string(),
                message: "merged before a placement was claimed".to_string(),
            });
        }
        if self.values.insert(key.clone(), value).is_none() {
            self.order.push(key);
        }
        Ok(())
    }

    /// Walked subtree of `key`
    pub fn get(&self, key: &RefKey) -> Option<&YamlValue> {
        self.values.get(key)
    }

    /// Placement claimed by `key`
    pub fn placement(&self, key: &RefKey) -> Option<&[String]> {
        self.placements.get(key).map(Vec::as_slice)
    }

    /// Walked subtree of whichever key owns `segments`
    pub fn at(&self, segments: &[String]) -> Option<&YamlValue> {
        self.owners.get(segments).and_then(|key| self.values.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Write every entry into `document`, creating intermediate mappings.
    ///
    /// A slot still holding a reference to itself (a `components` entry that
    /// was an external reference) is replaced outright; anything else is
    /// deep-merged. An entry that is only a reference to its own placement
    /// carries no content and is skipped.
    pub fn materialize(self, document: &mut YamlValue) -> Result<()> {
        let Self {
            order,
            mut values,
            placements,
            ..
        } = self;

        for key in order {
            let (Some(segments), Some(value)) = (placements.get(&key), values.remove(&key)) else {
                continue;
            };
            let own_pointer = pointer(segments);
            if is_self_reference(&value, &own_pointer) {
                continue;
            }
            let slot = yaml::locate_mut(document, segments)?;
            let replace = is_self_reference(slot, &own_pointer)
                || slot.is_null()
                || slot.as_mapping().is_some_and(|m| m.is_empty());
            if replace {
                *slot = value;
            } else {
                yaml::merge_yaml_values(slot, value, &own_pointer[1..]);
            }
        }
        Ok(())
    }
}

/// Whether `value` is exactly `{$ref: <pointer>}`
fn is_self_reference(value: &YamlValue, pointer: &str) -> bool {
    target_of(value) == Some(pointer) && value.as_mapping().is_some_and(|m| m.len() == 1)
}

/// Decode one escaped fragment segment (`~1` is `/`, `~0` is `~`).
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Escape a key so it can be used as one fragment segment.
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Parse a fragment into its decoded segments
///
/// A leading `/` is optional. Empty fragments (and a bare `/`) address the
/// document root and produce no segments.
///
/// # Examples
///
/// ```
/// use oapi_bundler::merge::parse_fragment;
///
/// let segments = parse_fragment("/paths/~1pets/get");
/// assert_eq!(segments, vec!["paths", "/pets", "get"]);
/// ```
pub fn parse_fragment(fragment: &str) -> Vec<String> {
    let trimmed = fragment.strip_prefix('/').unwrap_or(fragment);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').map(unescape_segment).collect()
}

/// Build an internal pointer (`#/a/b`) from decoded segments.
pub fn pointer(segments: &[String]) -> String {
    let escaped: Vec<String> = segments.iter().map(|s| escape_segment(s)).collect();
    format!("#/{}", escaped.join("/"))
}
