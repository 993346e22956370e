//! Vision provider abstraction and implementations.
//!
//! Supports Anthropic Claude and `OpenAI` (plus any `OpenAI`-compatible
//! server) via a common trait.

pub mod anthropic;
pub mod openai;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::AiError;
use crate::image::ImageInput;

/// Upper bound on generated tokens. A land-use answer is a few lines.
pub const MAX_TOKENS: u32 = 1024;

/// Default Anthropic model when `AI_MODEL` is unset.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Default `OpenAI` model when `AI_MODEL` is unset.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Trait for image-understanding providers.
#[async_trait::async_trait]
pub trait VisionProvider: Send + Sync {
    /// Short provider name for logs and API responses.
    fn name(&self) -> &str;

    /// Model identifier sent to the provider.
    fn model(&self) -> &str;

    /// Sends one image with a text prompt and returns the model's free-form
    /// text answer.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the response carries no
    /// text.
    async fn describe_image(
        &self,
        system_prompt: &str,
        prompt: &str,
        image: &ImageInput,
    ) -> Result<String, AiError>;
}

/// Supported provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    /// Anthropic Messages API.
    #[strum(serialize = "anthropic", serialize = "claude")]
    Anthropic,
    /// `OpenAI` chat completions, or a compatible server.
    #[strum(serialize = "openai", serialize = "gpt")]
    OpenAi,
}

/// Provider settings, normally read from the environment.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Explicit provider choice (`AI_PROVIDER`).
    pub provider: Option<String>,
    /// Model override (`AI_MODEL`).
    pub model: Option<String>,
    /// `OpenAI`-compatible base URL (`AI_BASE_URL`).
    pub base_url: Option<String>,
    /// `ANTHROPIC_API_KEY`.
    pub anthropic_api_key: Option<String>,
    /// `OPENAI_API_KEY`.
    pub openai_api_key: Option<String>,
}

impl ProviderConfig {
    /// Reads provider settings from environment variables. Empty values are
    /// treated as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            provider: var("AI_PROVIDER"),
            model: var("AI_MODEL"),
            base_url: var("AI_BASE_URL"),
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
        }
    }

    /// Resolves which backend to use.
    ///
    /// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
    /// auto-detects from available settings:
    ///
    /// 1. `ANTHROPIC_API_KEY` set -> Anthropic Claude
    /// 2. `OPENAI_API_KEY` or `AI_BASE_URL` set -> `OpenAI`(-compatible)
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] for an unknown provider name and
    /// [`AiError::NotConfigured`] when nothing is configured.
    pub fn kind(&self) -> Result<ProviderKind, AiError> {
        if let Some(name) = &self.provider {
            return name.trim().parse().map_err(|_| AiError::Config {
                message: format!("Unknown AI provider: {name}. Use 'anthropic' or 'openai'."),
            });
        }

        if self.anthropic_api_key.is_some() {
            log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
            return Ok(ProviderKind::Anthropic);
        }

        if self.openai_api_key.is_some() {
            log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY found)");
            return Ok(ProviderKind::OpenAi);
        }

        if self.base_url.is_some() {
            log::info!("Auto-detected AI provider: OpenAI-compatible (AI_BASE_URL found)");
            return Ok(ProviderKind::OpenAi);
        }

        Err(AiError::NotConfigured {
            message: "No AI credentials detected. Set one of: ANTHROPIC_API_KEY, \
                      OPENAI_API_KEY, or AI_BASE_URL. You can also set AI_PROVIDER explicitly."
                .to_string(),
        })
    }
}

/// Creates a provider from explicit settings.
///
/// # Errors
///
/// Returns [`AiError::Config`] if the selected provider is missing its
/// credentials.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn VisionProvider>, AiError> {
    match config.kind()? {
        ProviderKind::Anthropic => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .ok_or_else(|| AiError::Config {
                    message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
                })?;
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
            Ok(Box::new(anthropic::AnthropicProvider::new(api_key, model)))
        }
        ProviderKind::OpenAi => {
            // Local OpenAI-compatible servers usually need no key.
            if config.openai_api_key.is_none() && config.base_url.is_none() {
                return Err(AiError::Config {
                    message: "OPENAI_API_KEY environment variable not set".to_string(),
                });
            }
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
            Ok(Box::new(openai::OpenAiProvider::new(
                config.openai_api_key.clone(),
                model,
                config.base_url.clone(),
            )))
        }
    }
}

/// Creates a provider based on environment variables.
///
/// # Errors
///
/// Returns [`AiError::NotConfigured`] if no credentials are found and
/// [`AiError::Config`] if the explicitly requested provider is unknown or
/// missing its credentials.
pub fn create_provider_from_env() -> Result<Box<dyn VisionProvider>, AiError> {
    create_provider(&ProviderConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_aliases() {
        assert_eq!(
            "Claude".parse::<ProviderKind>().unwrap(),
            ProviderKind::Anthropic
        );
        assert_eq!("GPT".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
        assert!("bedrock".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn explicit_provider_wins_over_detection() {
        let config = ProviderConfig {
            provider: Some("openai".to_string()),
            anthropic_api_key: Some("sk-ant".to_string()),
            openai_api_key: Some("sk-oai".to_string()),
            ..ProviderConfig::default()
        };
        assert_eq!(config.kind().unwrap(), ProviderKind::OpenAi);
    }

    #[test]
    fn detects_anthropic_first() {
        let config = ProviderConfig {
            anthropic_api_key: Some("sk-ant".to_string()),
            openai_api_key: Some("sk-oai".to_string()),
            ..ProviderConfig::default()
        };
        assert_eq!(config.kind().unwrap(), ProviderKind::Anthropic);
    }

    #[test]
    fn base_url_alone_selects_openai_compatible() {
        let config = ProviderConfig {
            base_url: Some("http://localhost:11434/v1".to_string()),
            model: Some("llava".to_string()),
            ..ProviderConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "llava");
    }

    #[test]
    fn default_models_apply() {
        let config = ProviderConfig {
            anthropic_api_key: Some("sk-ant".to_string()),
            ..ProviderConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.model(), DEFAULT_ANTHROPIC_MODEL);
    }

    #[test]
    fn missing_credentials_are_config_errors() {
        assert!(matches!(
            create_provider(&ProviderConfig::default()),
            Err(AiError::NotConfigured { .. })
        ));
        let config = ProviderConfig {
            provider: Some("anthropic".to_string()),
            ..ProviderConfig::default()
        };
        assert!(matches!(
            create_provider(&config),
            Err(AiError::Config { .. })
        ));
        let config = ProviderConfig {
            provider: Some("bedrock".to_string()),
            ..ProviderConfig::default()
        };
        assert!(matches!(config.kind(), Err(AiError::Config { .. })));
    }
}
