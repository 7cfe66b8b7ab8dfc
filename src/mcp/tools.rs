//! MCP tools for Easel.

use crate::capabilities::CapabilityProfile;
use crate::error::{Error, Result};
use crate::generate::{
    create_template_from_image, handle_generate, CreateFromImageOutcome, CreateFromImageRequest,
    GenerateRequest, GenerateResponse,
};
use crate::params::ParameterSet;
use crate::sampling::SamplingClient;
use crate::store::{ListOptions, SortBy, SortOrder, TemplateStore};
use crate::template::{Category, CreateTemplate, TemplateRecord, TemplateSummary, UpdateTemplate};
use rust_mcp_sdk::macros;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tool for listing stored prompt templates.
#[macros::mcp_tool(
    name = "list_templates",
    description = "Lists stored image-generation prompt templates. Supports filtering by category ('character', 'landscape', 'style'), substring search over name and description, and sorting by 'name', 'createdAt' or 'updatedAt'. Inactive templates are hidden unless isActive is set to false."
)]
#[derive(Debug, Default, Deserialize, Serialize, macros::JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ListTemplatesTool {
    /// Sort key: name, createdAt or updatedAt (default name)
    pub sort_by: Option<String>,
    /// Sort direction: asc or desc (default asc)
    pub sort_order: Option<String>,
    /// Restrict the listing to one category
    pub category: Option<String>,
    /// Case-insensitive substring match over name and description
    pub search: Option<String>,
    /// List active (true, default) or inactive (false) templates
    pub is_active: Option<bool>,
}

impl ListTemplatesTool {
    pub fn execute(&self, store: &TemplateStore) -> Result<Vec<TemplateSummary>> {
        let options = ListOptions {
            sort_by: match self.sort_by.as_deref() {
                None | Some("name") => SortBy::Name,
                Some("createdAt") => SortBy::CreatedAt,
                Some("updatedAt") => SortBy::UpdatedAt,
                Some(other) => {
                    return Err(Error::InvalidParameters(format!("unknown sortBy '{other}'")))
                }
            },
            sort_order: match self.sort_order.as_deref() {
                None | Some("asc") => SortOrder::Asc,
                Some("desc") => SortOrder::Desc,
                Some(other) => {
                    return Err(Error::InvalidParameters(format!("unknown sortOrder '{other}'")))
                }
            },
            category: self.category.as_deref().map(parse_category).transpose()?,
            search: self.search.clone(),
            is_active: self.is_active,
        };
        store.list(&options)
    }
}

/// Tool for fetching one template record.
#[macros::mcp_tool(
    name = "get_template",
    description = "Fetches the full record of a stored template by id, optionally pinned to a specific version."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetTemplateTool {
    /// Template id
    pub id: String,
    /// Expected version; mismatches resolve to not-found
    pub version: Option<u32>,
}

impl GetTemplateTool {
    pub fn execute(&self, store: &TemplateStore) -> Result<TemplateRecord> {
        store.get(&self.id, self.version)
    }
}

/// Tool for creating a template.
#[macros::mcp_tool(
    name = "create_template",
    description = "Creates a new prompt template. The parameters object maps slot names (subject, action, environment, cameraAngle, style, details, lighting, mood, technical, quality, negativePrompt) to default values; a non-empty subject is required."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateTool {
    /// Display name
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Category: character, landscape or style
    pub category: String,
    /// Default parameter slots; subject is required
    pub parameters: HashMap<String, serde_json::Value>,
}

impl CreateTemplateTool {
    pub fn execute(&self, store: &TemplateStore) -> Result<TemplateRecord> {
        let object: serde_json::Map<String, serde_json::Value> =
            self.parameters.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        store.create(CreateTemplate {
            name: self.name.clone(),
            description: self.description.clone(),
            category: parse_category(&self.category)?,
            parameters: ParameterSet::from_json(&object)?,
        })
    }
}

/// Tool for updating a template.
#[macros::mcp_tool(
    name = "update_template",
    description = "Updates a stored template. Only supplied fields change; the version increases by one. Replacing parameters requires a non-empty subject."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateTool {
    /// Template id
    pub id: String,
    /// New display name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New category: character, landscape or style
    pub category: Option<String>,
    /// Replacement parameter slots (subject required when supplied)
    pub parameters: Option<HashMap<String, serde_json::Value>>,
    /// Activate or deactivate the template
    pub is_active: Option<bool>,
}

impl UpdateTemplateTool {
    pub fn execute(&self, store: &TemplateStore) -> Result<TemplateRecord> {
        let parameters = match &self.parameters {
            Some(map) => {
                let object: serde_json::Map<String, serde_json::Value> =
                    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                Some(ParameterSet::from_json(&object)?)
            }
            None => None,
        };
        store.update(
            &self.id,
            UpdateTemplate {
                name: self.name.clone(),
                description: self.description.clone(),
                category: self.category.as_deref().map(parse_category).transpose()?,
                parameters,
                is_active: self.is_active,
            },
        )
    }
}

/// Tool for deleting a template.
#[macros::mcp_tool(
    name = "delete_template",
    description = "Deletes a stored template by id."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTemplateTool {
    /// Template id
    pub id: String,
}

impl DeleteTemplateTool {
    pub fn execute(&self, store: &TemplateStore) -> Result<String> {
        store.delete(&self.id)?;
        Ok(format!("Template '{}' deleted.", self.id))
    }
}

/// Tool for creating a template from an image analysis.
#[macros::mcp_tool(
    name = "create_template_from_image",
    description = "Analyzes an image through the client's sampling capability and stores the extracted parameters as a new template. Without image sampling support, returns a manual parameter-filling guide instead."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateFromImageTool {
    /// URL of the image to analyze
    pub image_url: String,
    /// Display name (defaults to the analyzed subject)
    pub name: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Category: character, landscape or style (default style)
    pub category: Option<String>,
}

impl CreateTemplateFromImageTool {
    pub async fn execute(
        &self,
        store: &TemplateStore,
        client: &dyn SamplingClient,
        profile: &CapabilityProfile,
    ) -> Result<CreateFromImageOutcome> {
        let request = CreateFromImageRequest {
            image_url: self.image_url.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.as_deref().map(parse_category).transpose()?,
        };
        create_template_from_image(store, client, profile, request).await
    }
}

/// Tool for generating an image (or its prompt) from a template and
/// caller overrides.
#[macros::mcp_tool(
    name = "generate_image",
    description = "Assembles an image-generation prompt from a template and/or directly supplied slot values, then generates content through the client's sampling capability when supported. Without sampling support, returns the assembled prompt as text. Either templateId or subject must yield a subject."
)]
#[derive(Debug, Default, Deserialize, Serialize, macros::JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateImageTool {
    /// Id of the template supplying default slot values
    pub template_id: Option<String>,
    /// Expected template version; mismatches resolve to not-found
    pub template_version: Option<u32>,
    /// Main subject (required unless the template supplies one)
    pub subject: Option<String>,
    /// What the subject is doing
    pub action: Option<String>,
    /// The surrounding scene
    pub environment: Option<String>,
    /// Camera position, e.g. 'low angle'
    pub camera_angle: Option<String>,
    /// Artistic style, e.g. 'watercolor'
    pub style: Option<String>,
    /// Notable fine details
    pub details: Option<String>,
    /// Lighting conditions
    pub lighting: Option<String>,
    /// Emotional tone
    pub mood: Option<String>,
    /// Lens or rendering notes
    pub technical: Option<String>,
    /// Quality tags, e.g. '8k'
    pub quality: Option<String>,
    /// Things to avoid, kept out of the main prompt
    pub negative_prompt: Option<String>,
    /// Image width in pixels, 64-1024 (default 512)
    pub width: Option<u32>,
    /// Image height in pixels, 64-1024 (default 512)
    pub height: Option<u32>,
    /// Diffusion step count, 1-100 (default 20)
    pub sampling_steps: Option<u32>,
}

impl GenerateImageTool {
    fn params(&self) -> ParameterSet {
        ParameterSet {
            subject: self.subject.clone(),
            action: self.action.clone(),
            environment: self.environment.clone(),
            camera_angle: self.camera_angle.clone(),
            style: self.style.clone(),
            details: self.details.clone(),
            lighting: self.lighting.clone(),
            mood: self.mood.clone(),
            technical: self.technical.clone(),
            quality: self.quality.clone(),
            negative_prompt: self.negative_prompt.clone(),
        }
    }

    pub async fn execute(
        &self,
        store: &TemplateStore,
        client: &dyn SamplingClient,
        profile: &CapabilityProfile,
    ) -> Result<GenerateResponse> {
        let request = GenerateRequest {
            template_id: self.template_id.clone(),
            template_version: self.template_version,
            params: self.params(),
            width: self.width,
            height: self.height,
            sampling_steps: self.sampling_steps,
        };
        handle_generate(store, client, profile, request).await
    }
}

fn parse_category(value: &str) -> Result<Category> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| Error::InvalidParameters(format!("unknown category '{value}'")))
}
