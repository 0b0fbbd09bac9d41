use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use indexmap::IndexMap;
use pictura_config::ProviderSettings;
use pictura_core::{ImageResult, ImageSize, SupportedRatio};
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};

use super::{
    EditImage, GenerateImage, ImageProvider, ImageProviderSpec, api_error, base_url, connection_error,
    create_image_provider, require_api_key,
};
use crate::{
    error::{ImageGenError, Result},
    http_client::http_client,
    types::{EditImageParams, GenerateImageParams, ModelCapabilities, ModelDefinition},
};

const NAME: &str = "openai";
const VENDOR: &str = "OpenAI";

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Ratios the image endpoints produce natively
const NATIVE_RATIOS: [SupportedRatio; 3] = [
    SupportedRatio::Square,
    SupportedRatio::Landscape3x2,
    SupportedRatio::Portrait2x3,
];

/// `OpenAI` GPT Image generation and editing
pub fn openai() -> ImageProvider {
    let adapter = Arc::new(OpenAiImageProvider { client: http_client() });

    let mut models = IndexMap::new();
    for (id, max_resolution, full) in [
        ("gpt-image-1.5", ImageSize::TwoK, true),
        ("gpt-image-1", ImageSize::TwoK, true),
        ("gpt-image-1-mini", ImageSize::OneK, false),
    ] {
        models.insert(
            id.to_owned(),
            ModelDefinition {
                id: id.to_owned(),
                capabilities: ModelCapabilities {
                    max_resolution,
                    supported_ratios: NATIVE_RATIOS.to_vec(),
                    supports_reference: full,
                    supports_edit: full,
                    supports_inpaint: full,
                    supports_outpaint: false,
                },
            },
        );
    }

    create_image_provider(ImageProviderSpec {
        name: NAME.to_owned(),
        models,
        generate: adapter.clone(),
        edit: Some(adapter),
    })
}

/// Output size for a ratio, snapped to the nearest fixed size
const fn output_size(ratio: SupportedRatio) -> (&'static str, u32, u32) {
    match ratio {
        SupportedRatio::Square => ("1024x1024", 1024, 1024),
        SupportedRatio::Landscape3x2
        | SupportedRatio::Landscape4x3
        | SupportedRatio::Landscape5x4
        | SupportedRatio::Landscape16x9
        | SupportedRatio::Ultrawide21x9 => ("1536x1024", 1536, 1024),
        SupportedRatio::Portrait2x3
        | SupportedRatio::Portrait3x4
        | SupportedRatio::Portrait4x5
        | SupportedRatio::Portrait9x16 => ("1024x1536", 1024, 1536),
    }
}

const fn quality(size: ImageSize) -> &'static str {
    match size {
        ImageSize::OneK => "low",
        ImageSize::TwoK => "medium",
        ImageSize::FourK => "high",
    }
}

struct OpenAiImageProvider {
    client: Client,
}

/// Wire format for the `OpenAI` image generation API request
#[derive(Serialize)]
struct OpenAiImageRequest<'a> {
    model: &'a str,
    prompt: String,
    n: u32,
    size: &'static str,
    quality: &'static str,
}

/// Wire format for `OpenAI` image API responses
#[derive(Deserialize)]
struct OpenAiImageResponse {
    #[serde(default)]
    data: Vec<OpenAiImageData>,
}

#[derive(Deserialize)]
struct OpenAiImageData {
    b64_json: Option<String>,
}

fn png_part(data: &Bytes, file_name: &'static str) -> Result<Part> {
    Part::bytes(data.to_vec())
        .file_name(file_name)
        .mime_str("image/png")
        .map_err(|e| ImageGenError::InvalidRequest(format!("invalid image part: {e}")))
}

impl OpenAiImageProvider {
    async fn send(&self, request: reqwest::RequestBuilder, api_key: &str) -> Result<Bytes> {
        let response = request
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| connection_error(VENDOR, &e))?;

        if !response.status().is_success() {
            return Err(api_error(VENDOR, response).await);
        }

        let body: OpenAiImageResponse = response.json().await.map_err(|e| {
            tracing::error!(provider = NAME, error = %e, "failed to parse OpenAI image response");
            ImageGenError::InvalidResponse(format!("failed to parse OpenAI response: {e}"))
        })?;

        let encoded = body
            .data
            .into_iter()
            .find_map(|image| image.b64_json)
            .ok_or_else(|| ImageGenError::InvalidResponse("No image was generated in the response".to_owned()))?;

        STANDARD
            .decode(encoded)
            .map(Bytes::from)
            .map_err(|e| ImageGenError::InvalidResponse(format!("invalid base64 image data: {e}")))
    }
}

#[async_trait]
impl GenerateImage for OpenAiImageProvider {
    async fn generate_image(
        &self,
        model_id: &str,
        params: &GenerateImageParams,
        config: &ProviderSettings,
    ) -> Result<ImageResult> {
        let api_key = require_api_key(config, VENDOR)?;
        let root = base_url(config, DEFAULT_BASE_URL);
        let (size, width, height) = output_size(params.ratio);

        tracing::debug!(
            provider = NAME,
            model = model_id,
            size,
            with_reference = params.reference.is_some(),
            "sending image generation request"
        );

        // A reference image goes through the edits endpoint
        let request = if let Some(reference) = &params.reference {
            let form = Form::new()
                .text("model", model_id.to_owned())
                .text("prompt", params.full_prompt())
                .text("n", "1")
                .text("size", size)
                .part("image", png_part(reference, "reference.png")?);

            self.client.post(format!("{root}/images/edits")).multipart(form)
        } else {
            self.client
                .post(format!("{root}/images/generations"))
                .json(&OpenAiImageRequest {
                    model: model_id,
                    prompt: params.full_prompt(),
                    n: 1,
                    size,
                    quality: quality(params.size),
                })
        };

        let data = self.send(request, api_key).await?;

        Ok(ImageResult {
            data,
            ratio: params.ratio,
            width,
            height,
            provider: NAME.to_owned(),
            model: model_id.to_owned(),
        })
    }
}

#[async_trait]
impl EditImage for OpenAiImageProvider {
    async fn edit_image(
        &self,
        model_id: &str,
        params: &EditImageParams,
        config: &ProviderSettings,
    ) -> Result<ImageResult> {
        let api_key = require_api_key(config, VENDOR)?;
        let root = base_url(config, DEFAULT_BASE_URL);

        let prompt = if params.style.is_some() {
            format!("{}. Apply the style from the reference image.", params.prompt)
        } else {
            params.prompt.clone()
        };

        let form = Form::new()
            .text("model", model_id.to_owned())
            .text("prompt", prompt)
            .text("n", "1")
            .text("size", "1024x1024")
            .part("image", png_part(&params.image, "source.png")?);

        let data = self
            .send(self.client.post(format!("{root}/images/edits")).multipart(form), api_key)
            .await?;

        Ok(ImageResult {
            data,
            ratio: SupportedRatio::Square,
            width: 1024,
            height: 1024,
            provider: NAME.to_owned(),
            model: model_id.to_owned(),
        })
    }
}
