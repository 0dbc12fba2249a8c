use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Wire protocol spoken by an engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI Chat Completions API.
    OpenAi,

    /// Anthropic Messages API.
    Anthropic,
}

impl ProviderKind {
    /// Infers the provider from an engine name such as `openai` or `anthropic`.
    pub fn infer(engine_name: &str) -> Option<Self> {
        engine_name.to_ascii_lowercase().parse().ok()
    }

    /// Environment variable consulted when an engine names no `api_key_name`.
    pub fn default_api_key_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            _ => Err(format!("unknown provider: {s}")),
        }
    }
}

/// Per-model defaults from `engines.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier sent to the provider.
    pub name: String,

    /// Default sampling temperature, in `[0.0, 1.0]`.
    pub temperature: f32,

    /// Default maximum number of tokens to generate.
    pub max_tokens: u32,
}

/// One configured engine (provider) and the models it offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineDescriptor {
    /// Engine name; the key used by `--engine`.
    pub name: String,

    /// Models offered by the engine, in catalog order.
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,

    /// Model used when none is requested.
    pub default_model: String,

    /// Name of the environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_name: Option<String>,

    /// Wire protocol; inferred from `name` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,

    /// Override for the provider's API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl EngineDescriptor {
    /// Looks up a model by exact name.
    pub fn model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|model| model.name == name)
    }

    /// Names of the models this engine offers, in catalog order.
    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|model| model.name.as_str()).collect()
    }

    /// The wire protocol for this engine, if it can be determined.
    pub fn provider_kind(&self) -> Option<ProviderKind> {
        self.provider.or_else(|| ProviderKind::infer(&self.name))
    }

    /// The environment variable that holds this engine's API key.
    pub fn api_key_variable(&self) -> Option<&str> {
        self.api_key_name
            .as_deref()
            .or_else(|| self.provider_kind().map(|kind| kind.default_api_key_name()))
    }
}

/// Named temperature presets offered by the web form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSettings {
    /// Preset for precise, low-variance answers.
    #[serde(default = "TemperatureSettings::default_precise")]
    pub precise: f32,

    /// Preset between precise and creative.
    #[serde(default = "TemperatureSettings::default_balanced")]
    pub balanced: f32,

    /// Preset for creative answers.
    #[serde(default = "TemperatureSettings::default_creative")]
    pub creative: f32,
}

impl TemperatureSettings {
    fn default_precise() -> f32 {
        0.20
    }

    fn default_balanced() -> f32 {
        0.50
    }

    fn default_creative() -> f32 {
        0.75
    }
}

impl Default for TemperatureSettings {
    fn default() -> Self {
        Self {
            precise: Self::default_precise(),
            balanced: Self::default_balanced(),
            creative: Self::default_creative(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(name: &str) -> EngineDescriptor {
        EngineDescriptor {
            name: name.to_string(),
            models: vec![ModelDescriptor {
                name: "m1".to_string(),
                temperature: 0.3,
                max_tokens: 512,
            }],
            default_model: "m1".to_string(),
            api_key_name: None,
            provider: None,
            base_url: None,
        }
    }

    #[test]
    fn provider_is_inferred_from_name() {
        assert_eq!(engine("openai").provider_kind(), Some(ProviderKind::OpenAi));
        assert_eq!(
            engine("Anthropic").provider_kind(),
            Some(ProviderKind::Anthropic)
        );
        assert_eq!(engine("local").provider_kind(), None);
    }

    #[test]
    fn explicit_provider_wins() {
        let mut local = engine("local");
        local.provider = Some(ProviderKind::OpenAi);
        assert_eq!(local.provider_kind(), Some(ProviderKind::OpenAi));
        assert_eq!(local.api_key_variable(), Some("OPENAI_API_KEY"));
        local.api_key_name = Some("LOCAL_KEY".to_string());
        assert_eq!(local.api_key_variable(), Some("LOCAL_KEY"));
    }

    #[test]
    fn model_lookup_is_exact() {
        let openai = engine("openai");
        assert!(openai.model("m1").is_some());
        assert!(openai.model("M1").is_none());
        assert_eq!(openai.model_names(), vec!["m1"]);
    }

    #[test]
    fn temperature_settings_fill_missing_presets() {
        let settings: TemperatureSettings = serde_yaml::from_str("creative: 0.9").unwrap();
        assert_eq!(settings.creative, 0.9);
        assert_eq!(settings.balanced, 0.5);
        assert_eq!(settings.precise, 0.2);
    }
}
