//! Capability declaration negotiation.
//!
//! Clients declare the optional protocol features they support at
//! initialize time. The declaration arrives in one of two shapes: a JSON
//! array of feature names, or a JSON object whose keys are features. Both
//! are normalized through a single membership probe before classification,
//! and negotiation is total: malformed or missing declarations classify
//! as full non-support rather than failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Feature name a client declares to accept completion requests.
pub const FEATURE_SAMPLING: &str = "sampling";

/// Feature name a client declares to accept image content.
pub const FEATURE_IMAGE_CONTENT: &str = "image-content";

/// Per-request classification of a client's declared capabilities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityProfile {
    pub supports_basic_completion: bool,
    pub supports_media_content: bool,
    /// Advertised completion token limit, when the client declares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Model names the client advertises, when declared.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub models: Vec<String>,
}

impl CapabilityProfile {
    /// True if any completion path can be attempted at all.
    pub fn supports_completion(&self) -> bool {
        self.supports_basic_completion
    }

    /// True if an image-producing completion can be attempted.
    pub fn supports_image_completion(&self) -> bool {
        self.supports_basic_completion && self.supports_media_content
    }
}

/// The two declaration shapes, normalized behind one membership probe.
enum FeatureSet<'a> {
    List(&'a [Value]),
    Probe(&'a serde_json::Map<String, Value>),
}

impl FeatureSet<'_> {
    fn includes(&self, feature: &str) -> bool {
        match self {
            FeatureSet::List(items) => {
                items.iter().any(|item| item.as_str() == Some(feature))
            }
            FeatureSet::Probe(map) => {
                map.get(feature).map(|v| !v.is_null()).unwrap_or(false)
            }
        }
    }
}

/// Classifies a caller's capability declaration.
///
/// Never fails: `None`, non-array/non-object values, and declarations
/// without recognized features all yield the all-false profile.
pub fn negotiate(declaration: Option<&Value>) -> CapabilityProfile {
    let features = match declaration {
        Some(Value::Array(items)) => FeatureSet::List(items),
        Some(Value::Object(map)) => FeatureSet::Probe(map),
        _ => return CapabilityProfile::default(),
    };

    let mut profile = CapabilityProfile {
        supports_basic_completion: features.includes(FEATURE_SAMPLING),
        supports_media_content: features.includes(FEATURE_IMAGE_CONTENT),
        ..Default::default()
    };

    // Advertised limits only exist in the object shape, nested under the
    // sampling entry.
    if let FeatureSet::Probe(map) = &features {
        if let Some(sampling) = map.get(FEATURE_SAMPLING) {
            profile.max_tokens = sampling
                .get("maxTokens")
                .and_then(Value::as_u64)
                .map(|n| n as u32);
            if let Some(models) = sampling.get("models").and_then(Value::as_array) {
                profile.models = models
                    .iter()
                    .filter_map(|m| m.as_str().map(String::from))
                    .collect();
            }
        }
    }

    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_declaration_yields_no_support() {
        assert_eq!(negotiate(None), CapabilityProfile::default());
    }

    #[test]
    fn malformed_declarations_yield_no_support() {
        for value in [json!(null), json!("sampling"), json!(42), json!(true)] {
            let profile = negotiate(Some(&value));
            assert!(!profile.supports_basic_completion, "input: {value}");
            assert!(!profile.supports_media_content, "input: {value}");
        }
    }

    #[test]
    fn empty_shapes_yield_no_support() {
        for value in [json!({}), json!([]), json!({ "capabilities": {} })] {
            let profile = negotiate(Some(&value));
            assert_eq!(profile, CapabilityProfile::default(), "input: {value}");
        }
    }

    #[test]
    fn list_shape_membership() {
        let decl = json!(["sampling"]);
        let profile = negotiate(Some(&decl));
        assert!(profile.supports_basic_completion);
        assert!(!profile.supports_media_content);

        let decl = json!(["sampling", "image-content"]);
        let profile = negotiate(Some(&decl));
        assert!(profile.supports_basic_completion);
        assert!(profile.supports_media_content);
    }

    #[test]
    fn probe_shape_membership() {
        let decl = json!({ "sampling": {} });
        let profile = negotiate(Some(&decl));
        assert!(profile.supports_basic_completion);
        assert!(!profile.supports_media_content);

        let decl = json!({ "sampling": {}, "image-content": {} });
        let profile = negotiate(Some(&decl));
        assert!(profile.supports_image_completion());
    }

    #[test]
    fn both_shapes_classify_equivalently() {
        let list = json!(["sampling", "image-content"]);
        let probe = json!({ "sampling": {}, "image-content": {} });
        assert_eq!(negotiate(Some(&list)), negotiate(Some(&probe)));
    }

    #[test]
    fn null_probe_entry_does_not_count_as_support() {
        let decl = json!({ "sampling": null });
        assert!(!negotiate(Some(&decl)).supports_basic_completion);
    }

    #[test]
    fn media_support_without_sampling_does_not_allow_image_completion() {
        let decl = json!(["image-content"]);
        let profile = negotiate(Some(&decl));
        assert!(profile.supports_media_content);
        assert!(!profile.supports_image_completion());
    }

    #[test]
    fn advertised_limits_are_read_from_the_sampling_entry() {
        let decl = json!({
            "sampling": { "maxTokens": 4096, "models": ["sdxl", "flux"] },
            "image-content": {}
        });
        let profile = negotiate(Some(&decl));
        assert_eq!(profile.max_tokens, Some(4096));
        assert_eq!(profile.models, vec!["sdxl".to_string(), "flux".to_string()]);
    }
}
