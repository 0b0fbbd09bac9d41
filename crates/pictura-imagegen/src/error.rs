use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImageGenError>;

/// Provider lookup, capability and vendor API errors
#[derive(Debug, Error)]
pub enum ImageGenError {
    /// No generation provider is registered under this name
    #[error("Provider not registered: {0}")]
    ProviderNotRegistered(String),

    /// No upscale provider is registered under this name
    #[error("Upscale provider not registered: {0}")]
    UpscaleProviderNotRegistered(String),

    /// The model alias is not in the provider's model table
    #[error("Unknown model: {model} for provider {provider}")]
    UnknownModel { model: String, provider: String },

    /// The provider has no edit implementation
    #[error("Provider {0} does not support edit operations")]
    EditUnsupported(String),

    /// Every model in a fallback chain failed, in attempt order
    #[error("All providers failed: {}", join_messages(.0))]
    AllProvidersFailed(Vec<ImageGenError>),

    /// A fallback chain was built from an empty list
    #[error("Fallback chain must contain at least one model")]
    EmptyFallbackChain,

    /// The provider settings carry no API key
    #[error("{0} API key is required")]
    MissingApiKey(&'static str),

    /// The vendor rejected the credentials
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The vendor rejected the request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Provider API returned an error
    #[error("Provider API error ({status}): {message}")]
    ProviderApiError { status: u16, message: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The vendor answered with something we could not decode
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// An asynchronous upscale job reported failure
    #[error("Upscale job failed: {0}")]
    JobFailed(String),

    /// An asynchronous upscale job never completed
    #[error("Upscale job timed out after {0} polling attempts")]
    JobTimedOut(u32),
}

impl ImageGenError {
    /// Failures from individual attempts, or just this error
    pub fn attempts(&self) -> &[Self] {
        match self {
            Self::AllProvidersFailed(errors) => errors,
            other => std::slice::from_ref(other),
        }
    }
}

fn join_messages(errors: &[ImageGenError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
