use std::sync::Arc;

use indexmap::IndexMap;

use crate::provider::{ImageProvider, UpscaleProvider, gemini, openai, topaz};

/// Anything a [`Registry`] can index by name
pub trait NamedProvider {
    fn name(&self) -> &str;
}

impl NamedProvider for ImageProvider {
    fn name(&self) -> &str {
        Self::name(self)
    }
}

impl NamedProvider for UpscaleProvider {
    fn name(&self) -> &str {
        Self::name(self)
    }
}

/// Providers keyed by name
///
/// Owned by the application root and passed to the orchestrators, so tests
/// can build, fill and clear their own instance.
#[derive(Debug)]
pub struct Registry<T> {
    providers: IndexMap<String, Arc<T>>,
}

pub type ImageProviderRegistry = Registry<ImageProvider>;
pub type UpscaleProviderRegistry = Registry<UpscaleProvider>;

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            providers: IndexMap::new(),
        }
    }
}

impl<T: NamedProvider> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider, replacing any registered under the same name
    pub fn register(&mut self, provider: T) -> Option<Arc<T>> {
        let name = provider.name().to_owned();
        let previous = self.providers.insert(name.clone(), Arc::new(provider));
        if previous.is_some() {
            tracing::debug!(provider = %name, "replaced registered provider");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.providers.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Registry holding the built-in generation providers
pub fn builtin_image_providers() -> ImageProviderRegistry {
    let mut registry = ImageProviderRegistry::new();
    registry.register(gemini());
    registry.register(openai());
    registry
}

/// Registry holding the built-in upscale providers
pub fn builtin_upscale_providers() -> UpscaleProviderRegistry {
    let mut registry = UpscaleProviderRegistry::new();
    registry.register(topaz());
    registry
}
