//! Provider specs and the factories that wrap them

mod gemini;
mod openai;
mod topaz;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use indexmap::IndexMap;
use pictura_config::ProviderSettings;
use pictura_core::{Dimensions, ImageResult};

pub use gemini::gemini;
pub use openai::openai;
pub use topaz::{TOPAZ_MODELS, TopazPolling, topaz, topaz_with_polling};

use crate::{
    error::{ImageGenError, Result},
    types::{EditImageParams, GenerateImageParams, ModelDefinition, ModelSelector, UpscaleImageParams},
};

/// Text-to-image generation
#[async_trait]
pub trait GenerateImage: Send + Sync {
    /// Generate one image with the model registered under `model_id`
    async fn generate_image(
        &self,
        model_id: &str,
        params: &GenerateImageParams,
        config: &ProviderSettings,
    ) -> Result<ImageResult>;
}

/// Image editing
#[async_trait]
pub trait EditImage: Send + Sync {
    async fn edit_image(&self, model_id: &str, params: &EditImageParams, config: &ProviderSettings)
    -> Result<ImageResult>;
}

/// Resolution upscaling
#[async_trait]
pub trait Upscale: Send + Sync {
    async fn upscale(&self, params: &UpscaleImageParams, config: &ProviderSettings) -> Result<ImageResult>;
}

/// Everything needed to build an [`ImageProvider`]
pub struct ImageProviderSpec {
    pub name: String,
    /// Model aliases mapped to their vendor ids and capabilities
    pub models: IndexMap<String, ModelDefinition>,
    pub generate: Arc<dyn GenerateImage>,
    /// Left empty when the vendor cannot edit
    pub edit: Option<Arc<dyn EditImage>>,
}

/// A generation provider with a uniform interface
pub struct ImageProvider {
    spec: ImageProviderSpec,
}

/// Wrap a provider spec
pub fn create_image_provider(spec: ImageProviderSpec) -> ImageProvider {
    ImageProvider { spec }
}

impl ImageProvider {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Selector for a model alias
    pub fn model(&self, alias: &str) -> Result<ModelSelector> {
        let definition = self
            .spec
            .models
            .get(alias)
            .ok_or_else(|| ImageGenError::UnknownModel {
                model: alias.to_owned(),
                provider: self.spec.name.clone(),
            })?;

        Ok(ModelSelector {
            provider: self.spec.name.clone(),
            model_id: alias.to_owned(),
            capabilities: definition.capabilities.clone(),
        })
    }

    pub fn models(&self) -> &IndexMap<String, ModelDefinition> {
        &self.spec.models
    }

    pub async fn generate_image(
        &self,
        model_id: &str,
        params: &GenerateImageParams,
        config: &ProviderSettings,
    ) -> Result<ImageResult> {
        self.spec.generate.generate_image(model_id, params, config).await
    }

    /// The edit implementation, when the provider has one
    pub fn editor(&self) -> Option<&dyn EditImage> {
        self.spec.edit.as_deref()
    }

    pub fn supports_edit(&self) -> bool {
        self.spec.edit.is_some()
    }
}

impl fmt::Debug for ImageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageProvider")
            .field("name", &self.spec.name)
            .field("models", &self.spec.models.keys().collect::<Vec<_>>())
            .field("supports_edit", &self.supports_edit())
            .finish_non_exhaustive()
    }
}

/// Everything needed to build an [`UpscaleProvider`]
pub struct UpscaleProviderSpec {
    pub name: String,
    pub models: Vec<String>,
    pub max_scale: u32,
    pub upscale: Arc<dyn Upscale>,
}

/// An upscale provider with a uniform interface
pub struct UpscaleProvider {
    spec: UpscaleProviderSpec,
}

pub fn create_upscale_provider(spec: UpscaleProviderSpec) -> UpscaleProvider {
    UpscaleProvider { spec }
}

impl UpscaleProvider {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn models(&self) -> &[String] {
        &self.spec.models
    }

    pub fn max_scale(&self) -> u32 {
        self.spec.max_scale
    }

    pub async fn upscale(&self, params: &UpscaleImageParams, config: &ProviderSettings) -> Result<ImageResult> {
        self.spec.upscale.upscale(params, config).await
    }
}

impl fmt::Debug for UpscaleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpscaleProvider")
            .field("name", &self.spec.name)
            .field("models", &self.spec.models)
            .field("max_scale", &self.spec.max_scale)
            .finish_non_exhaustive()
    }
}

/// The configured API key, or the vendor's "key is required" error
pub(crate) fn require_api_key<'a>(config: &'a ProviderSettings, vendor: &'static str) -> Result<&'a str> {
    config.api_key().ok_or(ImageGenError::MissingApiKey(vendor))
}

/// Endpoint root from the settings or the vendor default
pub(crate) fn base_url<'a>(config: &'a ProviderSettings, default: &'a str) -> &'a str {
    config.base_url.as_deref().unwrap_or(default).trim_end_matches('/')
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Pixel dimensions from a PNG header
pub(crate) fn image_dimensions(data: &[u8]) -> Option<Dimensions> {
    if data.len() < 24 || !data.starts_with(PNG_SIGNATURE) || data[12..16] != *b"IHDR" {
        return None;
    }

    let width = u32::from_be_bytes(data[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(data[20..24].try_into().ok()?);
    Some(Dimensions { width, height })
}

pub(crate) fn connection_error(vendor: &str, error: &reqwest::Error) -> ImageGenError {
    tracing::error!(provider = vendor, error = %error, "request failed");
    ImageGenError::ConnectionError(format!("Failed to send request to {vendor}: {error}"))
}

/// Map a non-success vendor response to an error
pub(crate) async fn api_error(vendor: &str, response: reqwest::Response) -> ImageGenError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    tracing::error!(provider = vendor, status = %status, "{vendor} API error");

    match status.as_u16() {
        401 => ImageGenError::AuthenticationFailed(error_text),
        400 => ImageGenError::InvalidRequest(error_text),
        _ => ImageGenError::ProviderApiError {
            status: status.as_u16(),
            message: error_text,
        },
    }
}
