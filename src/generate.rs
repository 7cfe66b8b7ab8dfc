//! Request orchestration: template resolution, merge, assembly and the
//! completion branch.
//!
//! Each request runs end-to-end in a single task with exactly one
//! suspension point (the outbound completion call, when attempted). The
//! store is passed in by reference; no ambient state.

use crate::assemble::{assemble, AssembledPrompt};
use crate::capabilities::CapabilityProfile;
use crate::error::{Error, Result};
use crate::params::{merge, ParameterSet, Slot};
use crate::sampling::{
    complete, invoke, CompletionOutcome, CompletionRequest, GenerationMetadata, MessageContent,
    Role, SamplingClient, SamplingMessage,
};
use crate::store::TemplateStore;
use crate::template::{Category, CreateTemplate, TemplateProvenance, TemplateRecord};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DIMENSION: u32 = 512;
pub const MIN_DIMENSION: u32 = 64;
pub const MAX_DIMENSION: u32 = 1024;
pub const DEFAULT_STEPS: u32 = 20;
pub const MIN_STEPS: u32 = 1;
pub const MAX_STEPS: u32 = 100;

/// Input for a generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub template_id: Option<String>,
    pub template_version: Option<u32>,
    pub params: ParameterSet,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sampling_steps: Option<u32>,
}

/// The full generation response: the content (generated or fallback
/// text), the assembled prompt pair, the resolved parameters, the
/// generation knobs, and template provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub content: MessageContent,
    pub supports_sampling: bool,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub parameters: ParameterSet,
    pub width: u32,
    pub height: u32,
    pub sampling_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_template: Option<TemplateProvenance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

/// Handles a generation request end-to-end.
///
/// The degraded text path (no completion support negotiated) is a
/// success carrying `supports_sampling: false`. A failed completion call
/// after support was negotiated fails the whole request with
/// `SamplingFailed`; it is never silently downgraded to text.
pub async fn handle_generate(
    store: &TemplateStore,
    client: &dyn SamplingClient,
    profile: &CapabilityProfile,
    request: GenerateRequest,
) -> Result<GenerateResponse> {
    let template = match &request.template_id {
        Some(id) => Some(store.get(id, request.template_version)?),
        None => None,
    };

    let has_subject = |params: &ParameterSet| {
        params.subject.as_deref().map(|s| !s.is_empty()).unwrap_or(false)
    };
    let subject_available = has_subject(&request.params)
        || template.as_ref().map(|t| has_subject(&t.parameters)).unwrap_or(false);
    if !subject_available {
        return Err(Error::InvalidParameters(
            "a subject is required, either directly or from the template's defaults".into(),
        ));
    }

    let metadata = GenerationMetadata {
        width: dimension(request.width, "width")?,
        height: dimension(request.height, "height")?,
        sampling_steps: steps(request.sampling_steps)?,
    };

    let merged = merge(&request.params, template.as_ref().map(|t| &t.parameters))?;
    let assembled = assemble_merged(&merged)?;
    debug!("assembled prompt: {}", assembled.prompt);

    let provenance = template.as_ref().map(TemplateProvenance::from);

    if !profile.supports_completion() {
        return Ok(GenerateResponse {
            content: MessageContent::Text { text: assembled.prompt.clone() },
            supports_sampling: false,
            prompt: assembled.prompt,
            negative_prompt: assembled.negative_prompt,
            parameters: merged,
            width: metadata.width,
            height: metadata.height,
            sampling_steps: metadata.sampling_steps,
            used_template: provenance,
            model: None,
            stop_reason: None,
        });
    }

    match complete(client, &assembled, profile, metadata).await {
        Ok(CompletionOutcome::Completed { content, model, stop_reason }) => {
            Ok(GenerateResponse {
                content,
                supports_sampling: true,
                prompt: assembled.prompt,
                negative_prompt: assembled.negative_prompt,
                parameters: merged,
                width: metadata.width,
                height: metadata.height,
                sampling_steps: metadata.sampling_steps,
                used_template: provenance,
                model: Some(model),
                stop_reason,
            })
        }
        // The gateway only degrades when no support was negotiated, which
        // the branch above already handled.
        Ok(CompletionOutcome::Degraded { reason, .. }) => {
            Err(Error::Internal(anyhow::anyhow!(
                "gateway degraded after support was negotiated: {reason}"
            )))
        }
        Err(err) => Err(Error::SamplingFailed { source: Box::new(err) }),
    }
}

// Merge already normalized the parameters, so a failure here means the
// pipeline itself is broken and must not surface as a caller error.
fn assemble_merged(merged: &ParameterSet) -> Result<AssembledPrompt> {
    assemble(merged).map_err(|e| Error::Internal(anyhow::Error::new(e)))
}

fn dimension(value: Option<u32>, name: &str) -> Result<u32> {
    let value = value.unwrap_or(DEFAULT_DIMENSION);
    if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
        return Err(Error::InvalidParameters(format!(
            "{name} must be between {MIN_DIMENSION} and {MAX_DIMENSION}, got {value}"
        )));
    }
    Ok(value)
}

fn steps(value: Option<u32>) -> Result<u32> {
    let value = value.unwrap_or(DEFAULT_STEPS);
    if !(MIN_STEPS..=MAX_STEPS).contains(&value) {
        return Err(Error::InvalidParameters(format!(
            "samplingSteps must be between {MIN_STEPS} and {MAX_STEPS}, got {value}"
        )));
    }
    Ok(value)
}

/// Input for creating a template from an image analysis.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFromImageRequest {
    pub image_url: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
}

/// A structured in-band error payload for designed degraded paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: String,
    pub message: String,
}

/// Outcome of `create_template_from_image`. The unsupported branch is a
/// designed degraded result, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum CreateFromImageOutcome {
    #[serde(rename_all = "camelCase")]
    Created { template: TemplateRecord, analysis: String },
    #[serde(rename_all = "camelCase")]
    Unsupported { guide: String, error: StructuredError },
}

/// Analyzes an image through the client's sampling capability and stores
/// the extracted parameters as a new template.
///
/// Requires both basic completion and media content support; without
/// them, returns a manual parameter-filling guide plus a
/// `SAMPLING_NOT_SUPPORTED` structured payload.
pub async fn create_template_from_image(
    store: &TemplateStore,
    client: &dyn SamplingClient,
    profile: &CapabilityProfile,
    request: CreateFromImageRequest,
) -> Result<CreateFromImageOutcome> {
    if request.image_url.trim().is_empty() {
        return Err(Error::InvalidParameters("imageUrl must not be empty".into()));
    }

    if !profile.supports_image_completion() {
        return Ok(CreateFromImageOutcome::Unsupported {
            guide: parameter_guide(),
            error: StructuredError {
                code: "SAMPLING_NOT_SUPPORTED".into(),
                message: "The connected client does not support image sampling; \
                          fill in the template parameters manually instead."
                    .into(),
            },
        });
    }

    let analysis_request = CompletionRequest {
        messages: vec![SamplingMessage {
            role: Role::User,
            content: MessageContent::Text {
                text: format!(
                    "Analyze the image at {} and describe it as image-generation \
                     parameters, one per line, in the form 'name: value'. Use these \
                     names: subject, action, environment, cameraAngle, style, \
                     details, lighting, mood, technical, quality, negativePrompt. \
                     The subject line is mandatory.",
                    request.image_url
                ),
            },
        }],
        ..Default::default()
    };

    let response = invoke(client, analysis_request).await?;
    let analysis = match response.content {
        MessageContent::Text { text } => text,
        MessageContent::Image { .. } => {
            return Err(Error::InvalidResponse(
                "expected a text analysis, got image content".into(),
            ));
        }
    };

    let parameters = parse_analysis(&analysis);
    if parameters.subject.as_deref().map(str::is_empty).unwrap_or(true) {
        return Err(Error::InvalidResponse(
            "image analysis did not include a subject line".into(),
        ));
    }

    let name = request.name.unwrap_or_else(|| {
        // Derive a short name from the subject.
        let subject = parameters.subject.as_deref().unwrap_or("untitled");
        subject.chars().take(48).collect::<String>().trim().to_string()
    });
    let template = store.create(CreateTemplate {
        name,
        description: request
            .description
            .unwrap_or_else(|| "Created from image analysis".to_string()),
        category: request.category.unwrap_or(Category::Style),
        parameters,
    })?;

    Ok(CreateFromImageOutcome::Created { template, analysis })
}

/// Parses `name: value` lines from an analysis text into a parameter
/// set. Unknown names and malformed lines are skipped.
fn parse_analysis(analysis: &str) -> ParameterSet {
    let line = Regex::new(r"(?m)^\s*[-*]?\s*([A-Za-z][A-Za-z ]*?)\s*:\s*(.+?)\s*$")
        .expect("constant pattern");

    let mut object = serde_json::Map::new();
    for capture in line.captures_iter(analysis) {
        let key = capture[1].replace(' ', "").to_lowercase();
        let value = capture[2].to_string();
        if value.is_empty() {
            continue;
        }
        if let Some(slot) = Slot::ALL.iter().find(|s| s.name().to_lowercase() == key) {
            object.entry(slot.name().to_string()).or_insert_with(|| value.into());
        }
    }

    // Values are inserted as strings only, so this cannot fail.
    ParameterSet::from_json(&object).unwrap_or_default()
}

/// A manual parameter-filling guide, returned on the unsupported path.
fn parameter_guide() -> String {
    let mut lines = vec![
        "Describe the image using these parameters, then call create_template:".to_string(),
    ];
    for slot in Slot::ALL {
        let hint = match slot {
            Slot::Subject => "the main subject (required)",
            Slot::Action => "what the subject is doing",
            Slot::Environment => "the surrounding scene",
            Slot::CameraAngle => "camera position, e.g. 'low angle'",
            Slot::Style => "artistic style, e.g. 'watercolor'",
            Slot::Details => "notable fine details",
            Slot::Lighting => "lighting conditions",
            Slot::Mood => "emotional tone",
            Slot::Technical => "lens or rendering notes",
            Slot::Quality => "quality tags, e.g. '8k'",
            Slot::NegativePrompt => "things to avoid",
        };
        lines.push(format!("  {}: {}", slot.name(), hint));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labeled_analysis_lines() {
        let analysis = "\
subject: a lighthouse on a cliff
style: oil painting
Camera Angle: low angle
lighting: golden hour
unknown: ignored
not a labeled line";
        let params = parse_analysis(analysis);
        assert_eq!(params.subject.as_deref(), Some("a lighthouse on a cliff"));
        assert_eq!(params.style.as_deref(), Some("oil painting"));
        assert_eq!(params.camera_angle.as_deref(), Some("low angle"));
        assert_eq!(params.lighting.as_deref(), Some("golden hour"));
        assert_eq!(params.action, None);
    }

    #[test]
    fn first_occurrence_of_a_slot_wins() {
        let analysis = "subject: first\nsubject: second";
        let params = parse_analysis(analysis);
        assert_eq!(params.subject.as_deref(), Some("first"));
    }

    #[test]
    fn bullet_lines_are_accepted() {
        let analysis = "- subject: a koi pond\n* mood: tranquil";
        let params = parse_analysis(analysis);
        assert_eq!(params.subject.as_deref(), Some("a koi pond"));
        assert_eq!(params.mood.as_deref(), Some("tranquil"));
    }

    #[test]
    fn guide_names_every_slot() {
        let guide = parameter_guide();
        for slot in Slot::ALL {
            assert!(guide.contains(slot.name()), "guide missing {}", slot.name());
        }
    }

    #[test]
    fn assembly_failure_after_merge_surfaces_as_internal() {
        let broken = ParameterSet {
            subject: Some("a dog".into()),
            style: Some(String::new()),
            ..Default::default()
        };
        let err = assemble_merged(&broken).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn merged_parameters_always_assemble() {
        let overrides = ParameterSet {
            subject: Some("a dog".into()),
            style: Some(String::new()),
            ..Default::default()
        };
        let merged = merge(&overrides, None).unwrap();
        assert!(assemble_merged(&merged).is_ok());
    }

    #[test]
    fn dimension_and_step_ranges_are_enforced() {
        assert_eq!(dimension(None, "width").unwrap(), DEFAULT_DIMENSION);
        assert_eq!(dimension(Some(64), "width").unwrap(), 64);
        assert_eq!(dimension(Some(1024), "height").unwrap(), 1024);
        assert!(dimension(Some(63), "width").is_err());
        assert!(dimension(Some(2048), "height").is_err());

        assert_eq!(steps(None).unwrap(), DEFAULT_STEPS);
        assert!(steps(Some(0)).is_err());
        assert!(steps(Some(101)).is_err());
    }
}
