//! Provider Registry
//!
//! Name to implementation map. New providers are added by registering
//! them; dispatch never branches on provider names.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::completion::{CompletionProvider, ProviderError};

#[derive(Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn CompletionProvider>>,
    default_name: String,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("default_name", &self.default_name)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            providers: BTreeMap::new(),
            default_name: default_name.into(),
        }
    }

    /// Register under the provider's own name, replacing any previous entry
    pub fn register(&mut self, provider: Arc<dyn CompletionProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Builder variant of `register`
    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CompletionProvider>> {
        self.providers.get(name).cloned()
    }

    /// Named provider, or the default when `name` is `None`
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
        let name = name.unwrap_or(&self.default_name);
        self.get(name)
            .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
