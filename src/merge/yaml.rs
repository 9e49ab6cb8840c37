//! YAML tree navigation and merge operations
//!
//! This module walks parsed documents along fragment segments and merges
//! resolved subtrees into the bundled document.
//!
//! ## Features
//!
//! - Read-only lookup that reports how far a fragment resolved before failing
//! - Creating lookup that materializes missing intermediate mappings
//! - Deep merging of mappings with warnings when a value is overwritten

use log::warn;
use serde_yaml::Value as YamlValue;

use super::pointer;
use crate::error::{Error, Result};

/// Descend into a single child of `value` by segment.
///
/// Mappings are indexed by string key, sequences by numeric index.
fn child<'a>(value: &'a YamlValue, segment: &str) -> Option<&'a YamlValue> {
    match value {
        YamlValue::Mapping(map) => map.get(segment),
        YamlValue::Sequence(seq) => segment.parse::<usize>().ok().and_then(|idx| seq.get(idx)),
        YamlValue::Tagged(tagged) => child(&tagged.value, segment),
        _ => None,
    }
}

/// Locate the subtree addressed by `segments` without modifying anything.
///
/// # Arguments
///
/// * `root` - The document to search
/// * `segments` - Decoded fragment segments
/// * `reference` - The reference being resolved, for diagnostics
/// * `file` - Location key of the document, for diagnostics
///
/// # Errors
///
/// Returns `Error::ReferenceNotFound` carrying the segments that did resolve
/// when a segment is missing.
pub fn locate<'a>(
    root: &'a YamlValue,
    segments: &[String],
    reference: &str,
    file: &str,
) -> Result<&'a YamlValue> {
    let mut current = root;
    for (depth, segment) in segments.iter().enumerate() {
        current = child(current, segment).ok_or_else(|| Error::ReferenceNotFound {
            reference: reference.to_string(),
            walked: pointer(&segments[..depth])[2..].to_string(),
            file: file.to_string(),
        })?;
    }
    Ok(current)
}

/// Navigate to `segments` within `value`, creating intermediate mappings as
/// needed.
///
/// Null values along the way are replaced with empty mappings. Existing
/// sequences are indexed numerically but never extended.
///
/// # Errors
///
/// Returns `Error::InvalidReference` if the path runs into a scalar or an
/// out-of-range sequence index.
pub fn locate_mut<'a>(value: &'a mut YamlValue, segments: &[String]) -> Result<&'a mut YamlValue> {
    let mut current = value;
    for (depth, segment) in segments.iter().enumerate() {
        if current.is_null() {
            *current = YamlValue::Mapping(Default::default());
        }

        current = match current {
            YamlValue::Mapping(map) => map
                .entry(YamlValue::String(segment.clone()))
                .or_insert(YamlValue::Mapping(Default::default())),
            YamlValue::Sequence(seq) => {
                let len = seq.len();
                match segment.parse::<usize>() {
                    Ok(idx) if idx < len => &mut seq[idx],
                    _ => {
                        return Err(Error::InvalidReference {
                            reference: pointer(&segments[..=depth]),
                            message: format!(
                                "index '{}' out of range for sequence of {}",
                                segment, len
                            ),
                        })
                    }
                }
            }
            other => {
                return Err(Error::InvalidReference {
                    reference: pointer(&segments[..=depth]),
                    message: format!(
                        "expected mapping while navigating to '{}', found {}",
                        segment,
                        get_yaml_type_name(other)
                    ),
                })
            }
        };
    }

    Ok(current)
}

/// Recursively merge `source` into `target`
///
/// - Mappings: keys are merged recursively, source values win on conflict
/// - Everything else: the target is replaced when the values differ, with a
///   warning naming `path`
///
/// Identical values are left untouched, so merging a subtree onto itself is
/// a no-op.
pub fn merge_yaml_values(target: &mut YamlValue, source: YamlValue, path: &str) {
    match (target, source) {
        (YamlValue::Mapping(target_map), YamlValue::Mapping(source_map)) => {
            for (key, value) in source_map {
                let key_str = match &key {
                    YamlValue::String(s) => s.clone(),
                    other => format!("{:?}", other),
                };
                let new_path = format!("{}/{}", path, super::escape_segment(&key_str));

                match target_map.get_mut(&key) {
                    Some(existing) => merge_yaml_values(existing, value, &new_path),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target, source) => {
            if *target != source {
                if !target.is_null() && !is_empty_mapping(target) {
                    warn!(
                        "Overwriting value at '#{}': {} -> {}",
                        path,
                        get_yaml_type_name(target),
                        get_yaml_type_name(&source)
                    );
                }
                *target = source;
            }
        }
    }
}

fn is_empty_mapping(value: &YamlValue) -> bool {
    value.as_mapping().is_some_and(|m| m.is_empty())
}

/// Get a human-readable type name for a YAML value
///
/// Used for logging and error messages to describe the type of a value.
pub fn get_yaml_type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "Null",
        YamlValue::Bool(_) => "Bool",
        YamlValue::Number(_) => "Number",
        YamlValue::String(_) => "String",
        YamlValue::Sequence(_) => "Sequence",
        YamlValue::Mapping(_) => "Mapping",
        YamlValue::Tagged(_) => "Tagged",
    }
}
