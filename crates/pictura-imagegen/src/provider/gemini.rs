use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use indexmap::IndexMap;
use pictura_config::ProviderSettings;
use pictura_core::{Dimensions, ImageResult, ImageSize, SupportedRatio, dimensions_for_ratio};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    EditImage, GenerateImage, ImageProvider, ImageProviderSpec, api_error, base_url, connection_error,
    create_image_provider, image_dimensions, require_api_key,
};
use crate::{
    error::{ImageGenError, Result},
    http_client::http_client,
    types::{EditImageParams, GenerateImageParams, ModelCapabilities, ModelDefinition},
};

const NAME: &str = "gemini";
const VENDOR: &str = "Gemini";

/// Default Gemini API base URL
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Alias, vendor model id and resolution ceiling
const MODELS: [(&str, &str, ImageSize); 2] = [
    ("flash", "gemini-2.5-flash-image", ImageSize::OneK),
    ("pro", "gemini-3-pro-image-preview", ImageSize::FourK),
];

/// Gemini image generation and editing
pub fn gemini() -> ImageProvider {
    let adapter = Arc::new(GeminiImageProvider { client: http_client() });

    let models: IndexMap<_, _> = MODELS
        .iter()
        .map(|&(alias, id, max_resolution)| (alias.to_owned(), model(id, max_resolution)))
        .collect();

    create_image_provider(ImageProviderSpec {
        name: NAME.to_owned(),
        models,
        generate: adapter.clone(),
        edit: Some(adapter),
    })
}

fn model(id: &str, max_resolution: ImageSize) -> ModelDefinition {
    ModelDefinition {
        id: id.to_owned(),
        capabilities: ModelCapabilities {
            max_resolution,
            supported_ratios: SupportedRatio::ALL.to_vec(),
            supports_reference: true,
            supports_edit: true,
            supports_inpaint: true,
            supports_outpaint: true,
        },
    }
}

/// Full model id and resolution ceiling for an alias
fn resolve_model(alias: &str) -> Result<(&'static str, ImageSize)> {
    MODELS
        .iter()
        .find(|(name, ..)| *name == alias)
        .map(|&(_, id, max_resolution)| (id, max_resolution))
        .ok_or_else(|| ImageGenError::UnknownModel {
            model: alias.to_owned(),
            provider: NAME.to_owned(),
        })
}

struct GeminiImageProvider {
    client: Client,
}

/// Wire format for `generateContent` requests
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    InlineData(InlineData),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<&'static str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn inline_png(data: &Bytes) -> Part {
    Part::InlineData(InlineData {
        mime_type: "image/png".to_owned(),
        data: STANDARD.encode(data),
    })
}

impl GeminiImageProvider {
    async fn generate_content(
        &self,
        config: &ProviderSettings,
        model_id: &str,
        parts: Vec<Part>,
        image_config: Option<ImageConfig>,
    ) -> Result<Bytes> {
        let api_key = require_api_key(config, VENDOR)?;
        let url = format!(
            "{}/models/{model_id}:generateContent",
            base_url(config, DEFAULT_BASE_URL)
        );

        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE"],
                image_config,
            },
        };

        tracing::debug!(provider = NAME, model = model_id, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| connection_error(VENDOR, &e))?;

        if !response.status().is_success() {
            return Err(api_error(VENDOR, response).await);
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            tracing::error!(provider = NAME, error = %e, "failed to parse Gemini response");
            ImageGenError::InvalidResponse(format!("failed to parse Gemini response: {e}"))
        })?;

        if let Some(reason) = body.prompt_feedback.and_then(|feedback| feedback.block_reason) {
            return Err(ImageGenError::InvalidRequest(format!(
                "prompt blocked by Gemini safety filter: {reason}"
            )));
        }

        let encoded = body
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .find_map(|part| part.inline_data)
            .ok_or_else(|| ImageGenError::InvalidResponse("Gemini returned no image".to_owned()))?;

        let data = STANDARD
            .decode(encoded.data)
            .map_err(|e| ImageGenError::InvalidResponse(format!("invalid base64 image data: {e}")))?;

        Ok(Bytes::from(data))
    }
}

#[async_trait]
impl GenerateImage for GeminiImageProvider {
    async fn generate_image(
        &self,
        model_id: &str,
        params: &GenerateImageParams,
        config: &ProviderSettings,
    ) -> Result<ImageResult> {
        let (full_model_id, max_resolution) = resolve_model(model_id)?;
        let size = params.size.min(max_resolution);
        let Dimensions { width, height } = dimensions_for_ratio(params.ratio, size);

        let mut parts = vec![Part::Text(params.full_prompt())];
        if let Some(reference) = &params.reference {
            parts.push(inline_png(reference));
        }

        let image_config = ImageConfig {
            aspect_ratio: Some(params.ratio.as_str()),
            image_size: (max_resolution > ImageSize::OneK).then_some(size.as_str()),
        };

        let data = self
            .generate_content(config, full_model_id, parts, Some(image_config))
            .await?;

        Ok(ImageResult {
            data,
            ratio: params.ratio,
            width,
            height,
            provider: NAME.to_owned(),
            model: full_model_id.to_owned(),
        })
    }
}

#[async_trait]
impl EditImage for GeminiImageProvider {
    async fn edit_image(
        &self,
        model_id: &str,
        params: &EditImageParams,
        config: &ProviderSettings,
    ) -> Result<ImageResult> {
        let (full_model_id, _) = resolve_model(model_id)?;

        let prompt = match params.extend {
            Some(direction) => format!("{} Extend the canvas toward the {direction}.", params.prompt),
            None => params.prompt.clone(),
        };

        let mut parts = vec![Part::Text(prompt), inline_png(&params.image)];
        if let Some(style) = &params.style {
            parts.push(Part::Text("Style reference:".to_owned()));
            parts.push(inline_png(style));
        }

        let data = self.generate_content(config, full_model_id, parts, None).await?;

        let (ratio, Dimensions { width, height }) = match image_dimensions(&data) {
            Some(dims) => (
                SupportedRatio::closest_to(dims.width, dims.height).unwrap_or(SupportedRatio::Landscape16x9),
                dims,
            ),
            None => (
                SupportedRatio::Landscape16x9,
                dimensions_for_ratio(SupportedRatio::Landscape16x9, ImageSize::TwoK),
            ),
        };

        Ok(ImageResult {
            data,
            ratio,
            width,
            height,
            provider: NAME.to_owned(),
            model: full_model_id.to_owned(),
        })
    }
}
