//! Deterministic prompt assembly.
//!
//! A resolved [`ParameterSet`] renders into an ordered, labeled prompt
//! string: the subject first and unlabeled, every other present slot as
//! `label: value`, joined with `", "`. The negative prompt never appears
//! in the main string and is returned as its own field.

use crate::error::{Error, Result};
use crate::params::{ParameterSet, Slot};
use serde::{Deserialize, Serialize};

/// The rendered prompt pair produced by [`assemble`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledPrompt {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

/// Renders a parameter set into a prompt.
///
/// Validation is total and happens before any rendering: every present
/// slot value must be non-empty (`InvalidParameterValue` names the
/// offending slot) and the subject must be present (`MissingSubject`).
/// Rendering performs no truncation, escaping or whitespace
/// normalization; values pass through verbatim.
pub fn assemble(params: &ParameterSet) -> Result<AssembledPrompt> {
    for slot in Slot::ALL {
        if let Some(value) = params.get(slot) {
            if value.is_empty() {
                return Err(Error::InvalidParameterValue { slot: slot.name() });
            }
        }
    }

    let subject = params.get(Slot::Subject).ok_or(Error::MissingSubject)?;

    let mut components = Vec::with_capacity(Slot::ALL.len());
    components.push(subject.to_string());
    for slot in Slot::ALL {
        if let (Some(label), Some(value)) = (slot.label(), params.get(slot)) {
            components.push(format!("{label}: {value}"));
        }
    }

    Ok(AssembledPrompt {
        prompt: components.join(", "),
        negative_prompt: params.get(Slot::NegativePrompt).map(String::from),
    })
}
