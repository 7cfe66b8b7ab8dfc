//! Completion request model and the remote completion gateway.
//!
//! The gateway owns the decision of whether a completion is attempted at
//! all. When the negotiated profile declares no support, the outcome is a
//! designed degraded value, not an error; when support was declared and
//! the single outbound call misbehaves, that is a hard failure. Responses
//! are validated structurally before any use and never forwarded as-is.

use crate::assemble::AssembledPrompt;
use crate::capabilities::CapabilityProfile;
use crate::error::{Error, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role tag on a completion message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single content item, text or image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageContent {
    #[serde(rename_all = "camelCase")]
    Text { text: String },
    #[serde(rename_all = "camelCase")]
    Image { data: String, mime_type: String },
}

/// One role-tagged message in a completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingMessage {
    pub role: Role,
    pub content: MessageContent,
}

/// Outbound completion request: ordered messages, optional sampling
/// knobs, and a metadata bag the downstream generator consumes opaquely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub messages: Vec<SamplingMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub stop_sequences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_hint: Option<String>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty", default)]
    pub metadata: serde_json::Map<String, Value>,
}

/// A structurally validated completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    pub role: Role,
    pub content: MessageContent,
}

/// Transport seam to the remote completion capability.
///
/// Implementations return the raw response value; the gateway owns the
/// structural validation, so mocks can exercise malformed responses.
#[async_trait]
pub trait SamplingClient: Send + Sync {
    async fn create_message(&self, request: CompletionRequest) -> anyhow::Result<Value>;
}

/// The gateway's terminal outcomes. `Degraded` is a designed branch, not
/// a failure; genuine faults surface through the error channel instead.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed {
        content: MessageContent,
        model: String,
        stop_reason: Option<String>,
    },
    Degraded {
        fallback_prompt: String,
        reason: String,
    },
}

/// Internal attempt states, logged for diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatewayState {
    NotAttempted,
    Invoking,
    Succeeded,
    Failed,
}

/// Generation metadata forwarded opaquely to the completion capability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub width: u32,
    pub height: u32,
    pub sampling_steps: u32,
}

/// Attempts a single completion for an assembled prompt.
///
/// Exactly one outbound call is made when the profile declares support;
/// none otherwise. The gateway never retries; retry policy belongs to the
/// caller. Cancellation of the surrounding request aborts the pending
/// call at this function's single await point.
pub async fn complete(
    client: &dyn SamplingClient,
    prompt: &AssembledPrompt,
    profile: &CapabilityProfile,
    metadata: GenerationMetadata,
) -> Result<CompletionOutcome> {
    let mut state = GatewayState::NotAttempted;
    debug!("completion state: {state:?}");

    if !profile.supports_completion() {
        debug!("completion not attempted: capability not supported");
        return Ok(CompletionOutcome::Degraded {
            fallback_prompt: prompt.prompt.clone(),
            reason: "capability not supported".to_string(),
        });
    }

    let request = build_request(prompt, profile, metadata);

    state = GatewayState::Invoking;
    debug!("completion state: {state:?}");
    match invoke(client, request).await {
        Ok(response) => {
            state = GatewayState::Succeeded;
            debug!("completion state: {state:?} (model: {})", response.model);
            Ok(CompletionOutcome::Completed {
                content: response.content,
                model: response.model,
                stop_reason: response.stop_reason,
            })
        }
        Err(err) => {
            state = GatewayState::Failed;
            debug!("completion state: {state:?}");
            Err(err)
        }
    }
}

/// Issues a single completion call and validates the raw response.
///
/// Transport failures surface as `CompletionRequestFailed`; structurally
/// invalid responses as `InvalidResponse`. Callers decide whether support
/// was negotiated before invoking.
pub async fn invoke(
    client: &dyn SamplingClient,
    request: CompletionRequest,
) -> Result<CompletionResponse> {
    let raw = client
        .create_message(request)
        .await
        .map_err(|source| Error::CompletionRequestFailed { source })?;
    validate_response(&raw)
}

/// Builds the outbound request for an image-generation completion.
fn build_request(
    prompt: &AssembledPrompt,
    profile: &CapabilityProfile,
    metadata: GenerationMetadata,
) -> CompletionRequest {
    let mut bag = serde_json::Map::new();
    bag.insert("width".into(), metadata.width.into());
    bag.insert("height".into(), metadata.height.into());
    bag.insert("steps".into(), metadata.sampling_steps.into());
    if let Some(negative) = &prompt.negative_prompt {
        bag.insert("negativePrompt".into(), negative.as_str().into());
    }

    let instruction = if profile.supports_image_completion() {
        format!("Generate an image: {}", prompt.prompt)
    } else {
        format!("Describe the image that would result from: {}", prompt.prompt)
    };

    CompletionRequest {
        messages: vec![SamplingMessage {
            role: Role::User,
            content: MessageContent::Text { text: instruction },
        }],
        max_tokens: profile.max_tokens,
        model_hint: profile.models.first().cloned(),
        metadata: bag,
        ..Default::default()
    }
}

/// Validates a raw completion response per the structural invariants:
/// non-null, assistant role, a model identifier, and exactly one content
/// item carrying its type-specific required fields.
fn validate_response(raw: &Value) -> Result<CompletionResponse> {
    if raw.is_null() {
        return Err(Error::InvalidResponse("response is null".into()));
    }

    let response: CompletionResponse = serde_json::from_value(raw.clone())
        .map_err(|e| Error::InvalidResponse(format!("malformed response: {e}")))?;

    if response.role != Role::Assistant {
        return Err(Error::InvalidResponse("response role must be 'assistant'".into()));
    }
    if response.model.is_empty() {
        return Err(Error::InvalidResponse("response is missing a model identifier".into()));
    }
    match &response.content {
        MessageContent::Text { text } if text.is_empty() => {
            Err(Error::InvalidResponse("text content requires a non-empty body".into()))
        }
        MessageContent::Image { data, mime_type } if data.is_empty() || mime_type.is_empty() => {
            Err(Error::InvalidResponse(
                "image content requires base64 data and a MIME type".into(),
            ))
        }
        _ => Ok(response),
    }
}
