use bytes::Bytes;
use pictura_core::{ImageResult, ImageSize, SupportedRatio};

use crate::{
    error::{ImageGenError, Result},
    registry::ImageProviderRegistry,
    types::{GenerateImageParams, ModelWithFallbacks, ProviderConfigs},
};

/// Options for [`generate_image`]
#[derive(Debug, Clone)]
pub struct GenerateImageOptions {
    pub model: ModelWithFallbacks,
    pub prompt: String,
    pub ratio: SupportedRatio,
    pub size: ImageSize,
    pub reference: Option<Bytes>,
    pub negative_prompt: Option<String>,
    pub config: ProviderConfigs,
}

impl GenerateImageOptions {
    pub fn new(model: impl Into<ModelWithFallbacks>, prompt: impl Into<String>, ratio: SupportedRatio) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ratio,
            size: ImageSize::default(),
            reference: None,
            negative_prompt: None,
            config: ProviderConfigs::default(),
        }
    }

    #[must_use]
    pub const fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: Bytes) -> Self {
        self.reference = Some(reference);
        self
    }

    #[must_use]
    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative_prompt.into());
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: impl Into<ProviderConfigs>) -> Self {
        self.config = config.into();
        self
    }

    fn params(&self) -> GenerateImageParams {
        GenerateImageParams {
            prompt: self.prompt.clone(),
            ratio: self.ratio,
            size: self.size,
            reference: self.reference.clone(),
            negative_prompt: self.negative_prompt.clone(),
        }
    }
}

/// Options for [`generate_images`]
#[derive(Debug, Clone)]
pub struct GenerateImagesOptions {
    pub model: ModelWithFallbacks,
    pub prompt: String,
    pub ratios: Vec<SupportedRatio>,
    pub size: ImageSize,
    /// Shared by every ratio when set; otherwise the first result is used
    pub reference: Option<Bytes>,
    pub negative_prompt: Option<String>,
    pub config: ProviderConfigs,
}

impl GenerateImagesOptions {
    pub fn new(model: impl Into<ModelWithFallbacks>, prompt: impl Into<String>, ratios: Vec<SupportedRatio>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ratios,
            size: ImageSize::default(),
            reference: None,
            negative_prompt: None,
            config: ProviderConfigs::default(),
        }
    }

    #[must_use]
    pub const fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: Bytes) -> Self {
        self.reference = Some(reference);
        self
    }

    #[must_use]
    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative_prompt.into());
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: impl Into<ProviderConfigs>) -> Self {
        self.config = config.into();
        self
    }
}

/// Generate one image, walking the fallback chain until a model succeeds
///
/// Nothing is retried here; wrap the call in `pictura_retry::with_retry`
/// for that. When every model fails the error lists each failure in order.
pub async fn generate_image(registry: &ImageProviderRegistry, options: &GenerateImageOptions) -> Result<ImageResult> {
    generate_with_fallbacks(registry, &options.model, &options.config, &options.params()).await
}

async fn generate_with_fallbacks(
    registry: &ImageProviderRegistry,
    model: &ModelWithFallbacks,
    config: &ProviderConfigs,
    params: &GenerateImageParams,
) -> Result<ImageResult> {
    let mut errors = Vec::new();

    for selector in model.selectors() {
        let Some(provider) = registry.get(&selector.provider) else {
            tracing::warn!(provider = %selector.provider, "provider not registered, trying next model");
            errors.push(ImageGenError::ProviderNotRegistered(selector.provider.clone()));
            continue;
        };

        tracing::debug!(
            provider = %selector.provider,
            model = %selector.model_id,
            ratio = %params.ratio,
            size = %params.size,
            "generating image"
        );

        match provider
            .generate_image(&selector.model_id, params, config.for_provider(&selector.provider))
            .await
        {
            Ok(result) => {
                tracing::info!(
                    provider = %result.provider,
                    model = %result.model,
                    ratio = %result.ratio,
                    bytes = result.data.len(),
                    "image generated"
                );
                return Ok(result);
            }
            Err(e) => {
                tracing::warn!(
                    provider = %selector.provider,
                    model = %selector.model_id,
                    error = %e,
                    "generation failed, trying next model"
                );
                errors.push(e);
            }
        }
    }

    Err(ImageGenError::AllProvidersFailed(errors))
}

/// Generate one image per ratio, in order
///
/// Runs sequentially: without a caller-supplied reference, the first image
/// becomes the reference for every later ratio.
pub async fn generate_images(
    registry: &ImageProviderRegistry,
    options: &GenerateImagesOptions,
) -> Result<Vec<ImageResult>> {
    let mut results: Vec<ImageResult> = Vec::with_capacity(options.ratios.len());
    let mut reference = options.reference.clone();

    for &ratio in &options.ratios {
        let params = GenerateImageParams {
            prompt: options.prompt.clone(),
            ratio,
            size: options.size,
            reference: reference.clone(),
            negative_prompt: options.negative_prompt.clone(),
        };

        let result = generate_with_fallbacks(registry, &options.model, &options.config, &params).await?;

        if options.reference.is_none() && results.is_empty() {
            reference = Some(result.data.clone());
        }
        results.push(result);
    }

    Ok(results)
}
