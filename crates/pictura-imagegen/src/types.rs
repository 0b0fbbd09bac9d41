use std::fmt;

use bytes::Bytes;
use indexmap::IndexMap;
use pictura_config::ProviderSettings;
use pictura_core::{ImageSize, SupportedRatio};
use serde::{Deserialize, Serialize};

use crate::error::{ImageGenError, Result};

/// What a single model can do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCapabilities {
    pub max_resolution: ImageSize,
    pub supported_ratios: Vec<SupportedRatio>,
    pub supports_reference: bool,
    pub supports_edit: bool,
    pub supports_inpaint: bool,
    pub supports_outpaint: bool,
}

impl ModelCapabilities {
    pub fn supports_ratio(&self, ratio: SupportedRatio) -> bool {
        self.supported_ratios.contains(&ratio)
    }
}

/// A model alias entry in a provider's model table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefinition {
    /// Full vendor model identifier
    pub id: String,
    pub capabilities: ModelCapabilities,
}

/// One concrete model of one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelector {
    pub provider: String,
    /// Model alias as declared by the provider
    pub model_id: String,
    pub capabilities: ModelCapabilities,
}

/// A priority-ordered, non-empty chain of models
///
/// The first model that succeeds wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelWithFallbacks {
    models: Vec<ModelSelector>,
}

impl ModelWithFallbacks {
    pub fn single(model: ModelSelector) -> Self {
        Self { models: vec![model] }
    }

    pub fn chain(models: Vec<ModelSelector>) -> Result<Self> {
        if models.is_empty() {
            return Err(ImageGenError::EmptyFallbackChain);
        }
        Ok(Self { models })
    }

    pub fn selectors(&self) -> &[ModelSelector] {
        &self.models
    }

    /// Head of the chain
    pub fn primary(&self) -> &ModelSelector {
        &self.models[0]
    }
}

impl From<ModelSelector> for ModelWithFallbacks {
    fn from(model: ModelSelector) -> Self {
        Self::single(model)
    }
}

/// Provider settings for every provider a chain may reach
///
/// Providers without their own entry get the shared settings.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfigs {
    shared: ProviderSettings,
    by_provider: IndexMap<String, ProviderSettings>,
}

impl ProviderConfigs {
    pub fn shared(settings: ProviderSettings) -> Self {
        Self {
            shared: settings,
            by_provider: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, name: impl Into<String>, settings: ProviderSettings) -> Self {
        self.by_provider.insert(name.into(), settings);
        self
    }

    pub fn for_provider(&self, name: &str) -> &ProviderSettings {
        self.by_provider.get(name).unwrap_or(&self.shared)
    }
}

impl From<ProviderSettings> for ProviderConfigs {
    fn from(settings: ProviderSettings) -> Self {
        Self::shared(settings)
    }
}

/// Parameters for a single generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateImageParams {
    pub prompt: String,
    pub ratio: SupportedRatio,
    pub size: ImageSize,
    pub reference: Option<Bytes>,
    pub negative_prompt: Option<String>,
}

impl GenerateImageParams {
    /// Prompt text with the negative prompt folded in
    pub fn full_prompt(&self) -> String {
        match self.negative_prompt.as_deref().filter(|negative| !negative.trim().is_empty()) {
            Some(negative) => format!("{}\n\nAvoid: {negative}", self.prompt),
            None => self.prompt.clone(),
        }
    }
}

/// Side of the canvas an outpaint extends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutpaintDirection {
    Top,
    Bottom,
    Left,
    Right,
}

impl OutpaintDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for OutpaintDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutpaintDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(format!("unknown outpaint direction: {other}")),
        }
    }
}

/// Parameters handed to a provider's edit implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditImageParams {
    pub image: Bytes,
    pub prompt: String,
    pub mask: Option<String>,
    pub extend: Option<OutpaintDirection>,
    pub style: Option<Bytes>,
}

/// An edit operation and the inputs only it uses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditOperation {
    #[default]
    Refine,
    /// Modify a described region
    Inpaint { mask: Option<String> },
    /// Extend the canvas
    Outpaint { direction: Option<OutpaintDirection> },
    /// Apply the look of a style reference
    Restyle { style_ref: Option<Bytes> },
}

impl EditOperation {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Refine => "refine",
            Self::Inpaint { .. } => "inpaint",
            Self::Outpaint { .. } => "outpaint",
            Self::Restyle { .. } => "restyle",
        }
    }

    /// Inpaint region, ignoring blank descriptions
    pub fn mask(&self) -> Option<&str> {
        match self {
            Self::Inpaint { mask } => mask.as_deref().filter(|mask| !mask.trim().is_empty()),
            _ => None,
        }
    }

    /// Composite prompt sent to the provider
    pub fn edit_prompt(&self, prompt: &str) -> String {
        match self {
            Self::Refine => prompt.to_owned(),
            Self::Inpaint { .. } => match self.mask() {
                Some(mask) => format!("In the image, modify only the {mask}: {prompt}"),
                None => prompt.to_owned(),
            },
            Self::Outpaint { .. } => format!("Extend the image: {prompt}"),
            Self::Restyle { .. } => format!("Apply style to image: {prompt}"),
        }
    }

    /// Provider parameters carrying only this operation's fields
    pub fn to_params(&self, image: Bytes, prompt: &str) -> EditImageParams {
        let mut params = EditImageParams {
            image,
            prompt: self.edit_prompt(prompt),
            mask: None,
            extend: None,
            style: None,
        };

        match self {
            Self::Refine => {}
            Self::Inpaint { .. } => params.mask = self.mask().map(str::to_owned),
            Self::Outpaint { direction } => params.extend = *direction,
            Self::Restyle { style_ref } => params.style.clone_from(style_ref),
        }

        params
    }
}

/// Parameters for an upscale call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaleImageParams {
    pub image: Bytes,
    pub scale: u32,
    pub model: Option<String>,
}
