//! Prompt parameter slots and the merge engine.
//!
//! A [`ParameterSet`] maps the fixed set of semantic slots to optional
//! string values. Caller overrides are merged with a template's defaults
//! under a strict precedence rule: the override always wins when it is
//! present and non-empty.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// The fixed set of semantic prompt slots, in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Subject,
    Action,
    Environment,
    CameraAngle,
    Style,
    Details,
    Lighting,
    Mood,
    Technical,
    Quality,
    NegativePrompt,
}

impl Slot {
    /// All slots, in the order they render into the prompt.
    pub const ALL: [Slot; 11] = [
        Slot::Subject,
        Slot::Action,
        Slot::Environment,
        Slot::CameraAngle,
        Slot::Style,
        Slot::Details,
        Slot::Lighting,
        Slot::Mood,
        Slot::Technical,
        Slot::Quality,
        Slot::NegativePrompt,
    ];

    /// The wire name of the slot as it appears in tool parameters.
    pub fn name(self) -> &'static str {
        match self {
            Slot::Subject => "subject",
            Slot::Action => "action",
            Slot::Environment => "environment",
            Slot::CameraAngle => "cameraAngle",
            Slot::Style => "style",
            Slot::Details => "details",
            Slot::Lighting => "lighting",
            Slot::Mood => "mood",
            Slot::Technical => "technical",
            Slot::Quality => "quality",
            Slot::NegativePrompt => "negativePrompt",
        }
    }

    /// The label rendered in front of the slot's value.
    ///
    /// `cameraAngle` is shortened to `camera`; every other label matches
    /// the slot name. The subject renders unlabeled and the negative
    /// prompt is never rendered into the main prompt, so neither has a
    /// label.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Slot::Subject | Slot::NegativePrompt => None,
            Slot::Action => Some("action"),
            Slot::Environment => Some("environment"),
            Slot::CameraAngle => Some("camera"),
            Slot::Style => Some("style"),
            Slot::Details => Some("details"),
            Slot::Lighting => Some("lighting"),
            Slot::Mood => Some("mood"),
            Slot::Technical => Some("technical"),
            Slot::Quality => Some("quality"),
        }
    }
}

/// A mapping from the fixed slot set to optional string values.
///
/// Constructed fresh per request and treated as immutable once handed to
/// the assembler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_angle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lighting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

impl ParameterSet {
    /// Returns the value of a slot, if any.
    pub fn get(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::Subject => self.subject.as_deref(),
            Slot::Action => self.action.as_deref(),
            Slot::Environment => self.environment.as_deref(),
            Slot::CameraAngle => self.camera_angle.as_deref(),
            Slot::Style => self.style.as_deref(),
            Slot::Details => self.details.as_deref(),
            Slot::Lighting => self.lighting.as_deref(),
            Slot::Mood => self.mood.as_deref(),
            Slot::Technical => self.technical.as_deref(),
            Slot::Quality => self.quality.as_deref(),
            Slot::NegativePrompt => self.negative_prompt.as_deref(),
        }
    }

    fn set(&mut self, slot: Slot, value: Option<String>) {
        let field = match slot {
            Slot::Subject => &mut self.subject,
            Slot::Action => &mut self.action,
            Slot::Environment => &mut self.environment,
            Slot::CameraAngle => &mut self.camera_angle,
            Slot::Style => &mut self.style,
            Slot::Details => &mut self.details,
            Slot::Lighting => &mut self.lighting,
            Slot::Mood => &mut self.mood,
            Slot::Technical => &mut self.technical,
            Slot::Quality => &mut self.quality,
            Slot::NegativePrompt => &mut self.negative_prompt,
        };
        *field = value;
    }

    /// True if no slot carries a value.
    pub fn is_empty(&self) -> bool {
        Slot::ALL.iter().all(|&slot| self.get(slot).is_none())
    }

    /// Builds a ParameterSet from a caller-supplied JSON object,
    /// validating that every known slot, when supplied, is a string.
    ///
    /// Unknown keys are ignored; they belong to sibling tool parameters
    /// such as `width` or `templateId`.
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut params = ParameterSet::default();
        for slot in Slot::ALL {
            match object.get(slot.name()) {
                None | Some(serde_json::Value::Null) => {}
                Some(serde_json::Value::String(s)) => params.set(slot, Some(s.clone())),
                Some(_) => return Err(Error::InvalidParameterType { slot: slot.name() }),
            }
        }
        Ok(params)
    }
}

/// Merges caller overrides with a template's default parameters.
///
/// Precedence is strict and total: for every slot the override value wins
/// when it is present and non-empty; otherwise the template default is
/// used; otherwise the slot is absent. Empty-string values are normalized
/// away here, so the merged set never carries an empty slot. The merged
/// set must resolve a non-empty subject or the merge fails with
/// [`Error::MissingSubject`].
pub fn merge(overrides: &ParameterSet, defaults: Option<&ParameterSet>) -> Result<ParameterSet> {
    let mut merged = ParameterSet::default();
    for slot in Slot::ALL {
        let value = overrides
            .get(slot)
            .filter(|v| !v.is_empty())
            .or_else(|| defaults.and_then(|d| d.get(slot).filter(|v| !v.is_empty())));
        merged.set(slot, value.map(String::from));
    }

    if merged.subject.is_none() {
        return Err(Error::MissingSubject);
    }
    Ok(merged)
}
