//! Registry construction from configured HTTP providers

use std::sync::Arc;

use super::client::{ChatCompletionClient, ProviderSettings};
use crate::ports::completion::ProviderError;
use crate::ports::registry::ProviderRegistry;

impl ProviderRegistry {
    /// Build HTTP clients for every configured provider
    pub fn from_settings(
        default_name: impl Into<String>,
        settings: Vec<ProviderSettings>,
    ) -> Result<Self, ProviderError> {
        let mut registry = Self::new(default_name);
        for s in settings {
            let client = ChatCompletionClient::new(s)?;
            registry.register(Arc::new(client));
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_registers_each_provider() {
        let settings = vec![
            ProviderSettings::new("deepseek", "deepseek-ai/DeepSeek-V3"),
            ProviderSettings::new("openai", "gpt-4"),
        ];
        let registry = ProviderRegistry::from_settings("openai", settings).unwrap();

        assert_eq!(registry.default_name(), "openai");
        assert!(registry.get("deepseek").is_some());
        assert!(!registry.is_empty());
    }
}
