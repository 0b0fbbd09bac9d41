use bytes::Bytes;
use pictura_core::ImageResult;

use crate::{
    error::{ImageGenError, Result},
    registry::ImageProviderRegistry,
    types::{EditOperation, ModelWithFallbacks, ProviderConfigs},
};

/// Options for [`edit_image`]
#[derive(Debug, Clone)]
pub struct EditImageOptions {
    pub model: ModelWithFallbacks,
    pub image: Bytes,
    pub prompt: String,
    pub operation: EditOperation,
    pub config: ProviderConfigs,
}

impl EditImageOptions {
    pub fn new(model: impl Into<ModelWithFallbacks>, image: Bytes, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            image,
            prompt: prompt.into(),
            operation: EditOperation::default(),
            config: ProviderConfigs::default(),
        }
    }

    #[must_use]
    pub fn with_operation(mut self, operation: EditOperation) -> Self {
        self.operation = operation;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: impl Into<ProviderConfigs>) -> Self {
        self.config = config.into();
        self
    }
}

/// Edit an image, walking the fallback chain until a model succeeds
///
/// Providers without an edit implementation are skipped without being
/// called.
pub async fn edit_image(registry: &ImageProviderRegistry, options: &EditImageOptions) -> Result<ImageResult> {
    let params = options.operation.to_params(options.image.clone(), &options.prompt);
    let mut errors = Vec::new();

    for selector in options.model.selectors() {
        let Some(provider) = registry.get(&selector.provider) else {
            errors.push(ImageGenError::ProviderNotRegistered(selector.provider.clone()));
            continue;
        };

        let Some(editor) = provider.editor() else {
            tracing::debug!(provider = %selector.provider, "provider cannot edit, trying next model");
            errors.push(ImageGenError::EditUnsupported(selector.provider.clone()));
            continue;
        };

        tracing::debug!(
            provider = %selector.provider,
            model = %selector.model_id,
            operation = options.operation.name(),
            "editing image"
        );

        match editor
            .edit_image(&selector.model_id, &params, options.config.for_provider(&selector.provider))
            .await
        {
            Ok(result) => return Ok(result),
            Err(e) => {
                tracing::warn!(
                    provider = %selector.provider,
                    model = %selector.model_id,
                    error = %e,
                    "edit failed, trying next model"
                );
                errors.push(e);
            }
        }
    }

    Err(ImageGenError::AllProvidersFailed(errors))
}
