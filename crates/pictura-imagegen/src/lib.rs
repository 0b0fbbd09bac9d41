//! Image generation, editing and upscaling across vendor APIs
//!
//! Providers are built from a spec (name, model table, operation
//! implementations) and registered by name. The orchestrators walk an
//! ordered fallback chain of models and return the first success.

#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

mod edit;
mod error;
mod generate;
mod http_client;
pub mod provider;
mod registry;
#[cfg(test)]
mod testing;
mod types;
mod upscale;

pub use edit::{EditImageOptions, edit_image};
pub use error::{ImageGenError, Result};
pub use generate::{GenerateImageOptions, GenerateImagesOptions, generate_image, generate_images};
pub use provider::{
    EditImage, GenerateImage, ImageProvider, ImageProviderSpec, Upscale, UpscaleProvider, UpscaleProviderSpec,
    create_image_provider, create_upscale_provider,
};
pub use registry::{
    ImageProviderRegistry, NamedProvider, Registry, UpscaleProviderRegistry, builtin_image_providers,
    builtin_upscale_providers,
};
pub use types::{
    EditImageParams, EditOperation, GenerateImageParams, ModelCapabilities, ModelDefinition, ModelSelector,
    ModelWithFallbacks, OutpaintDirection, ProviderConfigs, UpscaleImageParams,
};
pub use upscale::{DEFAULT_UPSCALE_SCALE, UpscaleOptions, upscale_image};
