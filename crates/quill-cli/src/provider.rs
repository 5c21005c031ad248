use anyhow::{Context, Result};
use clap::Args;
use quill::providers::base::Provider;
use quill::providers::configs::{
    AnthropicProviderConfig, OpenAiProviderConfig, ProviderConfig, ANTHROPIC_DEFAULT_HOST,
    ANTHROPIC_DEFAULT_MODEL, OPENAI_DEFAULT_HOST, OPENAI_DEFAULT_MODEL,
};
use quill::providers::factory::{self, ProviderType};
use std::env;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct ProviderArgs {
    /// Model provider (anthropic or openai)
    #[arg(short, long, env = "QUILL_PROVIDER", default_value_t = ProviderType::Anthropic)]
    pub provider: ProviderType,

    /// API key (falls back to ANTHROPIC_API_KEY or OPENAI_API_KEY)
    #[arg(long, env = "QUILL_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model to use
    #[arg(short, long, env = "QUILL_MODEL")]
    pub model: Option<String>,

    /// Override the provider's API host
    #[arg(long, env = "QUILL_HOST")]
    pub host: Option<String>,
}

impl ProviderArgs {
    pub fn to_config(&self) -> Result<ProviderConfig> {
        self.to_config_with(|key| env::var(key).ok())
    }

    fn to_config_with<F>(&self, lookup: F) -> Result<ProviderConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fallback_var = match self.provider {
            ProviderType::Anthropic => "ANTHROPIC_API_KEY",
            ProviderType::OpenAi => "OPENAI_API_KEY",
        };
        let api_key = self
            .api_key
            .clone()
            .or_else(|| lookup(fallback_var))
            .with_context(|| {
                format!(
                    "API key must be provided via --api-key, QUILL_API_KEY or {}",
                    fallback_var
                )
            })?;

        Ok(match self.provider {
            ProviderType::Anthropic => ProviderConfig::Anthropic(AnthropicProviderConfig {
                host: self.host_or(ANTHROPIC_DEFAULT_HOST),
                api_key,
                model: self.model_or(ANTHROPIC_DEFAULT_MODEL),
                temperature: None,
                max_tokens: None,
            }),
            ProviderType::OpenAi => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host: self.host_or(OPENAI_DEFAULT_HOST),
                api_key,
                model: self.model_or(OPENAI_DEFAULT_MODEL),
                temperature: None,
                max_tokens: None,
            }),
        })
    }

    pub fn build(&self) -> Result<Arc<dyn Provider>> {
        Ok(Arc::from(factory::get_provider(self.to_config()?)?))
    }

    fn host_or(&self, default: &str) -> String {
        self.host.clone().unwrap_or_else(|| default.to_string())
    }

    fn model_or(&self, default: &str) -> String {
        self.model.clone().unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(provider: ProviderType, api_key: Option<&str>) -> ProviderArgs {
        ProviderArgs {
            provider,
            api_key: api_key.map(str::to_string),
            model: None,
            host: None,
        }
    }

    #[test]
    fn test_explicit_key_and_defaults() {
        let config = args(ProviderType::Anthropic, Some("secret"))
            .to_config_with(|_| None)
            .unwrap();
        match config {
            ProviderConfig::Anthropic(config) => {
                assert_eq!(config.api_key, "secret");
                assert_eq!(config.host, ANTHROPIC_DEFAULT_HOST);
                assert_eq!(config.model, ANTHROPIC_DEFAULT_MODEL);
            }
            other => panic!("unexpected config: {:?}", other),
        }
    }

    #[test]
    fn test_falls_back_to_vendor_key() {
        let mut openai = args(ProviderType::OpenAi, None);
        openai.model = Some("gpt-4o-mini".to_string());

        let config = openai
            .to_config_with(|key| (key == "OPENAI_API_KEY").then(|| "from-env".to_string()))
            .unwrap();
        assert_eq!(config.provider_type(), ProviderType::OpenAi);
        match config {
            ProviderConfig::OpenAi(config) => {
                assert_eq!(config.api_key, "from-env");
                assert_eq!(config.model, "gpt-4o-mini");
            }
            other => panic!("unexpected config: {:?}", other),
        }
    }

    #[test]
    fn test_missing_key_names_variables() {
        let err = args(ProviderType::Anthropic, None)
            .to_config_with(|_| None)
            .unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }
}
