//! In-memory providers for orchestrator tests

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use pictura_config::ProviderSettings;
use pictura_core::{ImageResult, ImageSize, SupportedRatio};

use crate::{
    error::{ImageGenError, Result},
    provider::{
        EditImage, GenerateImage, ImageProvider, ImageProviderSpec, Upscale, UpscaleProvider, UpscaleProviderSpec,
        create_image_provider, create_upscale_provider,
    },
    types::{
        EditImageParams, GenerateImageParams, ModelCapabilities, ModelDefinition, ModelSelector, UpscaleImageParams,
    },
};

#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Succeed,
    Fail(&'static str),
}

/// Parameters each fake received, in call order
#[derive(Default)]
pub struct Calls {
    generate: Mutex<Vec<GenerateImageParams>>,
    edit: Mutex<Vec<EditImageParams>>,
    upscale: Mutex<Vec<(UpscaleImageParams, Option<String>)>>,
}

impl Calls {
    pub fn generate_params(&self) -> Vec<GenerateImageParams> {
        self.generate.lock().unwrap().clone()
    }

    pub fn generate_count(&self) -> usize {
        self.generate.lock().unwrap().len()
    }

    pub fn edit_params(&self) -> Vec<EditImageParams> {
        self.edit.lock().unwrap().clone()
    }

    pub fn upscale_params(&self) -> Vec<(UpscaleImageParams, Option<String>)> {
        self.upscale.lock().unwrap().clone()
    }
}

pub struct FakeProvider {
    name: String,
    outcomes: Mutex<VecDeque<Outcome>>,
    calls: Arc<Calls>,
}

impl FakeProvider {
    /// Generation-only provider
    pub fn new(name: &str, outcomes: Vec<Outcome>) -> (ImageProvider, Arc<Calls>) {
        Self::build(name, outcomes, false)
    }

    /// Provider that can also edit
    pub fn editable(name: &str, outcomes: Vec<Outcome>) -> (ImageProvider, Arc<Calls>) {
        Self::build(name, outcomes, true)
    }

    fn build(name: &str, outcomes: Vec<Outcome>, edit: bool) -> (ImageProvider, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let fake = Arc::new(Self {
            name: name.to_owned(),
            outcomes: Mutex::new(outcomes.into()),
            calls: calls.clone(),
        });

        let mut models = IndexMap::new();
        models.insert(
            "default".to_owned(),
            ModelDefinition {
                id: format!("{name}-model"),
                capabilities: capabilities(),
            },
        );

        let provider = create_image_provider(ImageProviderSpec {
            name: name.to_owned(),
            models,
            generate: fake.clone(),
            edit: edit.then(|| fake as Arc<dyn EditImage>),
        });

        (provider, calls)
    }

    fn next(&self, ratio: SupportedRatio) -> Result<ImageResult> {
        let outcome = self.outcomes.lock().unwrap().pop_front().unwrap_or(Outcome::Succeed);
        let count = self.calls.generate_count() + self.calls.edit.lock().unwrap().len();

        match outcome {
            Outcome::Succeed => Ok(ImageResult {
                data: Bytes::from(format!("{}-image-{count}", self.name)),
                ratio,
                width: 1,
                height: 1,
                provider: self.name.clone(),
                model: format!("{}-model", self.name),
            }),
            Outcome::Fail(message) => Err(ImageGenError::ProviderApiError {
                status: 500,
                message: message.to_owned(),
            }),
        }
    }
}

#[async_trait]
impl GenerateImage for FakeProvider {
    async fn generate_image(
        &self,
        _model_id: &str,
        params: &GenerateImageParams,
        _config: &ProviderSettings,
    ) -> Result<ImageResult> {
        self.calls.generate.lock().unwrap().push(params.clone());
        self.next(params.ratio)
    }
}

#[async_trait]
impl EditImage for FakeProvider {
    async fn edit_image(
        &self,
        _model_id: &str,
        params: &EditImageParams,
        _config: &ProviderSettings,
    ) -> Result<ImageResult> {
        self.calls.edit.lock().unwrap().push(params.clone());
        self.next(SupportedRatio::Square)
    }
}

pub struct FakeUpscaler {
    calls: Arc<Calls>,
}

impl FakeUpscaler {
    pub fn new(name: &str) -> (UpscaleProvider, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let provider = create_upscale_provider(UpscaleProviderSpec {
            name: name.to_owned(),
            models: vec!["standard".to_owned()],
            max_scale: 8,
            upscale: Arc::new(Self { calls: calls.clone() }),
        });
        (provider, calls)
    }
}

#[async_trait]
impl Upscale for FakeUpscaler {
    async fn upscale(&self, params: &UpscaleImageParams, config: &ProviderSettings) -> Result<ImageResult> {
        self.calls
            .upscale
            .lock()
            .unwrap()
            .push((params.clone(), config.api_key().map(ToOwned::to_owned)));

        Ok(ImageResult {
            data: params.image.clone(),
            ratio: SupportedRatio::Square,
            width: 100 * params.scale,
            height: 100 * params.scale,
            provider: "fake".to_owned(),
            model: params.model.clone().unwrap_or_else(|| "standard".to_owned()),
        })
    }
}

fn capabilities() -> ModelCapabilities {
    ModelCapabilities {
        max_resolution: ImageSize::FourK,
        supported_ratios: SupportedRatio::ALL.to_vec(),
        supports_reference: true,
        supports_edit: true,
        supports_inpaint: true,
        supports_outpaint: true,
    }
}

/// Selector for the fake's single model
pub fn selector(provider: &str) -> ModelSelector {
    ModelSelector {
        provider: provider.to_owned(),
        model_id: "default".to_owned(),
        capabilities: capabilities(),
    }
}
