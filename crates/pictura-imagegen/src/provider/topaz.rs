use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use pictura_config::ProviderSettings;
use pictura_core::{Dimensions, ImageResult, SupportedRatio};
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;

use super::{
    Upscale, UpscaleProvider, UpscaleProviderSpec, api_error, base_url, connection_error, create_upscale_provider,
    image_dimensions, require_api_key,
};
use crate::{
    error::{ImageGenError, Result},
    http_client::http_client,
    types::UpscaleImageParams,
};

const NAME: &str = "topaz";
const VENDOR: &str = "Topaz";

/// Default Topaz Labs API base URL
const DEFAULT_BASE_URL: &str = "https://api.topazlabs.com";

const DEFAULT_MODEL: &str = "Standard V2";
const MAX_SCALE: u32 = 16;

pub const TOPAZ_MODELS: [&str; 7] = [
    "Standard V2",
    "Standard MAX",
    "Recovery V2",
    "High Fidelity V2",
    "Redefine",
    "Low Resolution V2",
    "CGI",
];

/// Status polling schedule for enhance jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopazPolling {
    /// Wait before the first status check
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_polls: u32,
}

impl Default for TopazPolling {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            max_polls: 60,
        }
    }
}

impl TopazPolling {
    /// Delay before the next check, growing by half each time
    fn next_delay(&self, current: Duration) -> Duration {
        current.mul_f64(1.5).min(self.max_delay)
    }
}

/// Topaz Labs image upscaling
pub fn topaz() -> UpscaleProvider {
    topaz_with_polling(TopazPolling::default())
}

/// Topaz upscaling with a custom polling schedule
pub fn topaz_with_polling(polling: TopazPolling) -> UpscaleProvider {
    create_upscale_provider(UpscaleProviderSpec {
        name: NAME.to_owned(),
        models: TOPAZ_MODELS.iter().map(|model| (*model).to_owned()).collect(),
        max_scale: MAX_SCALE,
        upscale: Arc::new(TopazUpscaler {
            client: http_client(),
            polling,
        }),
    })
}

struct TopazUpscaler {
    client: Client,
    polling: TopazPolling,
}

#[derive(Deserialize)]
struct SubmitResponse {
    process_id: String,
    eta: Option<f64>,
}

#[derive(Deserialize)]
struct StatusResponse {
    state: String,
    output_url: Option<String>,
    output_width: Option<u32>,
    output_height: Option<u32>,
    error: Option<String>,
}

struct CompletedJob {
    output_url: String,
    dimensions: Option<Dimensions>,
}

impl TopazUpscaler {
    async fn submit(&self, root: &str, api_key: &str, params: &UpscaleImageParams, model: &str) -> Result<String> {
        let image = Part::bytes(params.image.to_vec())
            .file_name("input.png")
            .mime_str("image/png")
            .map_err(|e| ImageGenError::InvalidRequest(format!("invalid image part: {e}")))?;

        let mut form = Form::new()
            .part("image", image)
            .text("model", model.to_owned())
            .text("output_format", "png");

        if let Some(input) = image_dimensions(&params.image) {
            form = form
                .text("output_width", input.width.saturating_mul(params.scale).to_string())
                .text("output_height", input.height.saturating_mul(params.scale).to_string());
        }

        let response = self
            .client
            .post(format!("{root}/image/v1/enhance/async"))
            .header("X-API-Key", api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| connection_error(VENDOR, &e))?;

        if !response.status().is_success() {
            return Err(api_error(VENDOR, response).await);
        }

        let submitted: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ImageGenError::InvalidResponse(format!("failed to parse Topaz submit response: {e}")))?;

        tracing::debug!(
            provider = NAME,
            process_id = %submitted.process_id,
            eta = ?submitted.eta,
            "enhance job submitted"
        );

        Ok(submitted.process_id)
    }

    async fn wait_for_completion(&self, root: &str, api_key: &str, process_id: &str) -> Result<CompletedJob> {
        let mut delay = self.polling.initial_delay;

        for poll in 1..=self.polling.max_polls {
            tokio::time::sleep(delay).await;
            delay = self.polling.next_delay(delay);

            let response = self
                .client
                .get(format!("{root}/image/v1/enhance/async/{process_id}"))
                .header("X-API-Key", api_key)
                .send()
                .await
                .map_err(|e| connection_error(VENDOR, &e))?;

            if !response.status().is_success() {
                return Err(api_error(VENDOR, response).await);
            }

            let status: StatusResponse = response
                .json()
                .await
                .map_err(|e| ImageGenError::InvalidResponse(format!("failed to parse Topaz status: {e}")))?;

            tracing::trace!(provider = NAME, process_id, poll, state = %status.state, "polled enhance job");

            match (status.state.as_str(), status.output_url) {
                ("completed", Some(output_url)) => {
                    let dimensions = status
                        .output_width
                        .zip(status.output_height)
                        .filter(|(width, height)| *width > 0 && *height > 0)
                        .map(|(width, height)| Dimensions { width, height });
                    return Ok(CompletedJob { output_url, dimensions });
                }
                ("failed", _) => {
                    return Err(ImageGenError::JobFailed(
                        status.error.unwrap_or_else(|| "Unknown error".to_owned()),
                    ));
                }
                _ => {}
            }
        }

        Err(ImageGenError::JobTimedOut(self.polling.max_polls))
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| connection_error(VENDOR, &e))?;

        if !response.status().is_success() {
            return Err(api_error(VENDOR, response).await);
        }

        response
            .bytes()
            .await
            .map_err(|e| ImageGenError::ConnectionError(format!("Failed to download Topaz output: {e}")))
    }
}

#[async_trait]
impl Upscale for TopazUpscaler {
    async fn upscale(&self, params: &UpscaleImageParams, config: &ProviderSettings) -> Result<ImageResult> {
        let api_key = require_api_key(config, VENDOR)?;

        let model = params.model.as_deref().unwrap_or(DEFAULT_MODEL);
        if !TOPAZ_MODELS.contains(&model) {
            return Err(ImageGenError::UnknownModel {
                model: model.to_owned(),
                provider: NAME.to_owned(),
            });
        }

        if params.scale == 0 || params.scale > MAX_SCALE {
            return Err(ImageGenError::InvalidRequest(format!(
                "scale must be between 1 and {MAX_SCALE}, got {}",
                params.scale
            )));
        }

        let root = base_url(config, DEFAULT_BASE_URL);
        let process_id = self.submit(root, api_key, params, model).await?;
        let job = self.wait_for_completion(root, api_key, &process_id).await?;
        let data = self.download(&job.output_url).await?;

        let Dimensions { width, height } = job
            .dimensions
            .or_else(|| image_dimensions(&data))
            .unwrap_or(Dimensions { width: 0, height: 0 });
        let ratio = SupportedRatio::closest_to(width, height).unwrap_or(SupportedRatio::Landscape16x9);

        tracing::info!(provider = NAME, model, width, height, "upscale complete");

        Ok(ImageResult {
            data,
            ratio,
            width,
            height,
            provider: NAME.to_owned(),
            model: model.to_owned(),
        })
    }
}
