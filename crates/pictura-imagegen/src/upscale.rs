use bytes::Bytes;
use pictura_config::ProviderSettings;
use pictura_core::ImageResult;

use crate::{
    error::{ImageGenError, Result},
    registry::UpscaleProviderRegistry,
    types::UpscaleImageParams,
};

/// Scale factor used when a request names none
pub const DEFAULT_UPSCALE_SCALE: u32 = 4;

/// Options for [`upscale_image`]
#[derive(Debug, Clone)]
pub struct UpscaleOptions {
    pub image: Bytes,
    pub scale: Option<u32>,
    pub model: Option<String>,
    /// Upscale provider to use; there is no fallback
    pub provider: String,
    pub config: ProviderSettings,
}

impl UpscaleOptions {
    pub fn new(provider: impl Into<String>, image: Bytes) -> Self {
        Self {
            image,
            scale: None,
            model: None,
            provider: provider.into(),
            config: ProviderSettings::default(),
        }
    }

    #[must_use]
    pub const fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ProviderSettings) -> Self {
        self.config = config;
        self
    }
}

/// Upscale an image with the named provider, single shot
pub async fn upscale_image(registry: &UpscaleProviderRegistry, options: &UpscaleOptions) -> Result<ImageResult> {
    let provider = registry
        .get(&options.provider)
        .ok_or_else(|| ImageGenError::UpscaleProviderNotRegistered(options.provider.clone()))?;

    let params = UpscaleImageParams {
        image: options.image.clone(),
        scale: options.scale.unwrap_or(DEFAULT_UPSCALE_SCALE),
        model: options.model.clone(),
    };

    tracing::debug!(
        provider = %options.provider,
        scale = params.scale,
        model = params.model.as_deref(),
        "upscaling image"
    );

    provider.upscale(&params, &options.config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeUpscaler;

    #[tokio::test]
    async fn unregistered_provider_fails() {
        let registry = UpscaleProviderRegistry::new();
        let options = UpscaleOptions::new("replicate", Bytes::from_static(b"img"));

        let err = upscale_image(&registry, &options).await.unwrap_err();
        assert_eq!(err.to_string(), "Upscale provider not registered: replicate");
    }

    #[tokio::test]
    async fn delegates_with_default_scale() {
        let (provider, calls) = FakeUpscaler::new("fake");
        let mut registry = UpscaleProviderRegistry::new();
        registry.register(provider);

        let options = UpscaleOptions::new("fake", Bytes::from_static(b"img"))
            .with_config(ProviderSettings::with_api_key("secret"));
        let result = upscale_image(&registry, &options).await.unwrap();

        assert_eq!(result.width, 400);
        let (params, key) = &calls.upscale_params()[0];
        assert_eq!(params.scale, DEFAULT_UPSCALE_SCALE);
        assert!(params.model.is_none());
        assert_eq!(key.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn passes_explicit_scale_and_model() {
        let (provider, calls) = FakeUpscaler::new("fake");
        let mut registry = UpscaleProviderRegistry::new();
        registry.register(provider);

        let options = UpscaleOptions::new("fake", Bytes::from_static(b"img"))
            .with_scale(2)
            .with_model("CGI");
        let result = upscale_image(&registry, &options).await.unwrap();

        assert_eq!(result.model, "CGI");
        assert_eq!(calls.upscale_params()[0].0.scale, 2);
    }
}
