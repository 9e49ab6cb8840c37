//! Reference nodes and component categories
//!
//! A reference is a mapping carrying a string `$ref` field. Its target is
//! classified once, up front, into one of three variants, and the resolver
//! matches on the variant instead of probing the string again.

use serde_yaml::Value as YamlValue;

use crate::path::{is_remote, split_reference};

/// Field that marks a mapping as a reference
pub const REF_FIELD: &str = "$ref";

/// A classified reference target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    /// `#/a/b`, resolved against the document that owns the node.
    /// Holds the fragment without the `#`.
    Internal(&'a str),
    /// A local file path, optionally followed by `#fragment`
    External(&'a str),
    /// An absolute HTTP(S) URL, optionally followed by `#fragment`
    Remote(&'a str),
}

impl<'a> Reference<'a> {
    /// Classify a reference target string.
    pub fn classify(target: &'a str) -> Self {
        if let Some(fragment) = target.strip_prefix('#') {
            return Reference::Internal(fragment);
        }
        let (path, _) = split_reference(target);
        if is_remote(path) {
            Reference::Remote(target)
        } else {
            Reference::External(target)
        }
    }

    /// Classify `value` if it is a reference node.
    pub fn from_value(value: &'a YamlValue) -> Option<Self> {
        target_of(value).map(Reference::classify)
    }
}

/// The `$ref` target of a mapping, if it has a string one.
pub fn target_of(value: &YamlValue) -> Option<&str> {
    value.as_mapping()?.get(REF_FIELD)?.as_str()
}

/// Point a reference node at `target`, keeping any sibling fields.
pub fn set_target(value: &mut YamlValue, target: &str) {
    match value.as_mapping_mut() {
        Some(map) => {
            map.insert(
                YamlValue::String(REF_FIELD.to_string()),
                YamlValue::String(target.to_string()),
            );
        }
        None => *value = reference_node(target),
    }
}

/// Build a fresh `{$ref: target}` node.
pub fn reference_node(target: &str) -> YamlValue {
    let mut map = serde_yaml::Mapping::new();
    map.insert(
        YamlValue::String(REF_FIELD.to_string()),
        YamlValue::String(target.to_string()),
    );
    YamlValue::Mapping(map)
}

/// Component categories of an OpenAPI `components` object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Schemas,
    Responses,
    Parameters,
    Examples,
    RequestBodies,
    Headers,
    SecuritySchemes,
    Links,
    Callbacks,
    PathItems,
}

impl Category {
    /// Key of the category under `components`
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Schemas => "schemas",
            Category::Responses => "responses",
            Category::Parameters => "parameters",
            Category::Examples => "examples",
            Category::RequestBodies => "requestBodies",
            Category::Headers => "headers",
            Category::SecuritySchemes => "securitySchemes",
            Category::Links => "links",
            Category::Callbacks => "callbacks",
            Category::PathItems => "pathItems",
        }
    }

    /// Category named by a `components` key
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "schemas" => Some(Category::Schemas),
            "responses" => Some(Category::Responses),
            "parameters" => Some(Category::Parameters),
            "examples" => Some(Category::Examples),
            "requestBodies" => Some(Category::RequestBodies),
            "headers" => Some(Category::Headers),
            "securitySchemes" => Some(Category::SecuritySchemes),
            "links" => Some(Category::Links),
            "callbacks" => Some(Category::Callbacks),
            "pathItems" => Some(Category::PathItems),
            _ => None,
        }
    }

    /// Category of the value stored under `field`, given the category of
    /// its parent.
    ///
    /// Schema subtrees only ever contain schemas, so `Schemas` is sticky:
    /// a property named `headers` inside a schema is still a schema.
    pub fn descend(current: Option<Self>, field: &str) -> Option<Self> {
        if current == Some(Category::Schemas) {
            return current;
        }
        match field {
            "schema" => Some(Category::Schemas),
            "requestBody" => Some(Category::RequestBodies),
            other => Category::from_name(other).or(current),
        }
    }

    /// Category implied by a merged location such as `components/schemas/User`
    pub fn from_segments(segments: &[String]) -> Option<Self> {
        match segments {
            [first, second, ..] if first == "components" => Category::from_name(second),
            [first, ..] => Category::from_name(first),
            [] => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> YamlValue {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            Reference::classify("#/components/schemas/User"),
            Reference::Internal("/components/schemas/User")
        );
        assert_eq!(
            Reference::classify("schemas/user.yaml#/User"),
            Reference::External("schemas/user.yaml#/User")
        );
        assert_eq!(
            Reference::classify("../pet.yaml"),
            Reference::External("../pet.yaml")
        );
        assert_eq!(
            Reference::classify("https://example.com/pet.yaml#/Pet"),
            Reference::Remote("https://example.com/pet.yaml#/Pet")
        );
    }

    #[test]
    fn test_from_value() {
        let node = yaml("$ref: '#/components/schemas/User'");
        assert_eq!(
            Reference::from_value(&node),
            Some(Reference::Internal("/components/schemas/User"))
        );
        assert_eq!(Reference::from_value(&yaml("type: object")), None);
        // A non-string $ref (e.g. a property named $ref) is not a reference
        assert_eq!(Reference::from_value(&yaml("$ref: {type: string}")), None);
        assert_eq!(Reference::from_value(&yaml("- a")), None);
    }

    #[test]
    fn test_set_target_keeps_siblings() {
        let mut node = yaml("$ref: user.yaml#/User\ndescription: The owner");
        set_target(&mut node, "#/components/schemas/User");
        assert_eq!(target_of(&node), Some("#/components/schemas/User"));
        assert_eq!(node["description"], YamlValue::String("The owner".to_string()));
    }

    #[test]
    fn test_reference_node() {
        let node = reference_node("#/components/schemas/User");
        assert_eq!(node, yaml("$ref: '#/components/schemas/User'"));
    }

    #[test]
    fn test_category_names_roundtrip() {
        for name in ["schemas", "responses", "parameters", "requestBodies", "pathItems"] {
            assert_eq!(Category::from_name(name).unwrap().as_str(), name);
        }
        assert_eq!(Category::from_name("definitions"), None);
    }

    #[test]
    fn test_category_descend() {
        assert_eq!(Category::descend(None, "schema"), Some(Category::Schemas));
        assert_eq!(Category::descend(None, "parameters"), Some(Category::Parameters));
        assert_eq!(
            Category::descend(Some(Category::Responses), "headers"),
            Some(Category::Headers)
        );
        assert_eq!(
            Category::descend(Some(Category::Responses), "content"),
            Some(Category::Responses)
        );
        assert_eq!(Category::descend(None, "get"), None);
    }

    #[test]
    fn test_category_schemas_is_sticky() {
        assert_eq!(
            Category::descend(Some(Category::Schemas), "headers"),
            Some(Category::Schemas)
        );
        assert_eq!(
            Category::descend(Some(Category::Schemas), "parameters"),
            Some(Category::Schemas)
        );
    }

    #[test]
    fn test_category_from_segments() {
        let segments = |s: &[&str]| s.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        assert_eq!(
            Category::from_segments(&segments(&["components", "parameters", "Limit"])),
            Some(Category::Parameters)
        );
        assert_eq!(
            Category::from_segments(&segments(&["schemas", "User"])),
            Some(Category::Schemas)
        );
        assert_eq!(Category::from_segments(&segments(&["User"])), None);
        assert_eq!(Category::from_segments(&[]), None);
    }
}
