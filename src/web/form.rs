//! Form state for the browser front-end.
//!
//! Every request carries the full form; [`FormState::resolve`] turns the
//! submitted fields into concrete choices, falling back to catalog defaults
//! wherever a field is missing or invalid.

use std::fmt;

use url::form_urlencoded;

use crate::catalog::EngineCatalog;
use crate::types::{EngineDescriptor, TemperatureSettings};

/// Fixed max-token choices offered before `custom`.
pub const MAX_TOKEN_CHOICES: [u32; 4] = [256, 512, 1024, 2048];

/// Bounds of the custom temperature input.
pub const TEMPERATURE_RANGE: (f32, f32) = (0.0, 1.0);

/// Step of the custom temperature input.
pub const TEMPERATURE_STEP: f32 = 0.01;

/// Bounds of the custom max-tokens input.
pub const MAX_TOKENS_RANGE: (u32, u32) = (1, 65536);

/// Step of the custom max-tokens input.
pub const MAX_TOKENS_STEP: u32 = 128;

/// Value of the submit button that asks for a reply.
pub const RESPOND_ACTION: &str = "respond";

/// The temperature option select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperaturePreset {
    /// The `creative` preset.
    Creative,
    /// The `balanced` preset.
    Balanced,
    /// The `precise` preset.
    Precise,
    /// A value typed into the custom input.
    Custom,
}

impl TemperaturePreset {
    /// All options, in display order.
    pub const ALL: [TemperaturePreset; 4] = [
        TemperaturePreset::Creative,
        TemperaturePreset::Balanced,
        TemperaturePreset::Precise,
        TemperaturePreset::Custom,
    ];

    /// The form value for this option.
    pub fn key(&self) -> &'static str {
        match self {
            TemperaturePreset::Creative => "creative",
            TemperaturePreset::Balanced => "balanced",
            TemperaturePreset::Precise => "precise",
            TemperaturePreset::Custom => "custom",
        }
    }

    /// Parses a form value.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.key() == key)
    }

    /// The preset's temperature, or `None` for custom.
    pub fn value(&self, settings: &TemperatureSettings) -> Option<f32> {
        match self {
            TemperaturePreset::Creative => Some(settings.creative),
            TemperaturePreset::Balanced => Some(settings.balanced),
            TemperaturePreset::Precise => Some(settings.precise),
            TemperaturePreset::Custom => None,
        }
    }

    /// The label shown in the select, such as `creative leaning (0.75)`.
    pub fn label(&self, settings: &TemperatureSettings) -> String {
        match self {
            TemperaturePreset::Creative => format!("creative leaning ({})", settings.creative),
            TemperaturePreset::Balanced => format!("balanced ({})", settings.balanced),
            TemperaturePreset::Precise => format!("precise leaning ({})", settings.precise),
            TemperaturePreset::Custom => "custom".to_string(),
        }
    }
}

/// The max-tokens option select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxTokensOption {
    /// One of [`MAX_TOKEN_CHOICES`].
    Preset(u32),
    /// A value typed into the custom input.
    Custom,
}

impl MaxTokensOption {
    /// All options, in display order.
    pub fn all() -> Vec<MaxTokensOption> {
        MAX_TOKEN_CHOICES
            .into_iter()
            .map(MaxTokensOption::Preset)
            .chain(std::iter::once(MaxTokensOption::Custom))
            .collect()
    }

    /// The option pre-selected for a resolved default.
    pub fn for_default(max_tokens: u32) -> Self {
        if MAX_TOKEN_CHOICES.contains(&max_tokens) {
            MaxTokensOption::Preset(max_tokens)
        } else {
            MaxTokensOption::Custom
        }
    }

    /// Parses a form value.
    pub fn from_key(key: &str) -> Option<Self> {
        if key == "custom" {
            return Some(MaxTokensOption::Custom);
        }
        key.parse::<u32>()
            .ok()
            .filter(|value| MAX_TOKEN_CHOICES.contains(value))
            .map(MaxTokensOption::Preset)
    }
}

impl fmt::Display for MaxTokensOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxTokensOption::Preset(value) => write!(f, "{value}"),
            MaxTokensOption::Custom => write!(f, "custom"),
        }
    }
}

/// Raw form fields as submitted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormInput {
    /// Selected engine.
    pub engine: Option<String>,
    /// Selected model.
    pub model: Option<String>,
    /// Temperature option key.
    pub temperature_option: Option<String>,
    /// Custom temperature text.
    pub custom_temperature: Option<String>,
    /// Max-tokens option key.
    pub max_tokens_option: Option<String>,
    /// Custom max-tokens text.
    pub custom_max_tokens: Option<String>,
    /// Decorator paths, whitespace separated.
    pub decorators: Option<String>,
    /// Prompt text.
    pub prompt: Option<String>,
    /// Set by the submit button.
    pub action: Option<String>,
}

impl FormInput {
    /// Parses an `application/x-www-form-urlencoded` body or query string.
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut input = Self::default();
        for (key, value) in form_urlencoded::parse(body) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "engine" => input.engine = value,
                "model" => input.model = value,
                "temperature_option" => input.temperature_option = value,
                "custom_temperature" => input.custom_temperature = value,
                "max_tokens_option" => input.max_tokens_option = value,
                "custom_max_tokens" => input.custom_max_tokens = value,
                "decorators" => input.decorators = value,
                "prompt" => input.prompt = value,
                "action" => input.action = value,
                _ => {}
            }
        }
        input
    }

    /// True when the "Get response" button was pressed.
    pub fn wants_reply(&self) -> bool {
        self.action.as_deref() == Some(RESPOND_ACTION)
    }
}

/// Every form choice, resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    /// The selected engine.
    pub engine: EngineDescriptor,
    /// The selected model.
    pub model: String,
    /// Temperature presets from the catalog.
    pub temperature_settings: TemperatureSettings,
    /// The selected temperature option.
    pub temperature_option: TemperaturePreset,
    /// The effective temperature.
    pub temperature: f32,
    /// The model's default temperature.
    pub default_temperature: f32,
    /// The selected max-tokens option.
    pub max_tokens_option: MaxTokensOption,
    /// The effective max tokens.
    pub max_tokens: u32,
    /// The model's default max tokens.
    pub default_max_tokens: u32,
    /// Decorator text area contents.
    pub decorator_text: String,
    /// Prompt text area contents.
    pub prompt: String,
    /// Notices about rejected input.
    pub notices: Vec<String>,
}

impl FormState {
    /// Resolves submitted fields against the catalog.
    ///
    /// Unknown engines select the catalog default and models the selected
    /// engine does not offer select the engine's default model. Custom values
    /// outside their bounds are replaced by the model default with a notice.
    pub fn resolve(
        catalog: &EngineCatalog,
        default_decorators: &[String],
        input: &FormInput,
    ) -> Self {
        let mut notices = Vec::new();

        let engine = input
            .engine
            .as_deref()
            .and_then(|name| catalog.engine(name))
            .unwrap_or_else(|| catalog.default_engine())
            .clone();

        let model = match input.model.as_deref() {
            Some(model) if engine.model(model).is_some() => model.to_string(),
            _ => engine.default_model.clone(),
        };

        let defaults = catalog.resolve_defaults(&engine.name, &model);
        let temperature_settings = *catalog.temperature_settings();

        let temperature_option = input
            .temperature_option
            .as_deref()
            .and_then(TemperaturePreset::from_key)
            .unwrap_or(TemperaturePreset::Creative);
        let temperature = match temperature_option.value(&temperature_settings) {
            Some(value) => value,
            None => custom_temperature(
                input.custom_temperature.as_deref(),
                defaults.temperature,
                &mut notices,
            ),
        };

        let max_tokens_option = input
            .max_tokens_option
            .as_deref()
            .and_then(MaxTokensOption::from_key)
            .unwrap_or_else(|| MaxTokensOption::for_default(defaults.max_tokens));
        let max_tokens = match max_tokens_option {
            MaxTokensOption::Preset(value) => value,
            MaxTokensOption::Custom => custom_max_tokens(
                input.custom_max_tokens.as_deref(),
                defaults.max_tokens,
                &mut notices,
            ),
        };

        let decorator_text = input
            .decorators
            .clone()
            .unwrap_or_else(|| default_decorators.join("\n"));

        Self {
            engine,
            model,
            temperature_settings,
            temperature_option,
            temperature,
            default_temperature: defaults.temperature,
            max_tokens_option,
            max_tokens,
            default_max_tokens: defaults.max_tokens,
            decorator_text,
            prompt: input.prompt.clone().unwrap_or_default(),
            notices,
        }
    }

    /// Decorator paths from the text area, split on whitespace.
    pub fn decorator_paths(&self) -> Vec<String> {
        self.decorator_text
            .split_whitespace()
            .map(String::from)
            .collect()
    }

    /// Models offered for the selected engine, including its default model.
    pub fn model_choices(&self) -> Vec<&str> {
        let mut choices = self.engine.model_names();
        if !self.engine.default_model.is_empty()
            && !choices.contains(&self.engine.default_model.as_str())
        {
            choices.insert(0, self.engine.default_model.as_str());
        }
        choices
    }
}

fn custom_temperature(raw: Option<&str>, default: f32, notices: &mut Vec<String>) -> f32 {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return default;
    };
    let (low, high) = TEMPERATURE_RANGE;
    match raw.parse::<f32>() {
        Ok(value) if (low..=high).contains(&value) => value,
        _ => {
            notices.push(format!(
                "Custom temperature {raw} must be between {low} and {high}; using {default}."
            ));
            default
        }
    }
}

fn custom_max_tokens(raw: Option<&str>, default: u32, notices: &mut Vec<String>) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return default;
    };
    let (low, high) = MAX_TOKENS_RANGE;
    match raw.parse::<u32>() {
        Ok(value) if (low..=high).contains(&value) => value,
        _ => {
            notices.push(format!(
                "Custom max_tokens {raw} must be between {low} and {high}; using {default}."
            ));
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample;

    fn resolve(fields: &str) -> FormState {
        FormState::resolve(
            &sample(),
            &["a.md".to_string(), "dir".to_string()],
            &FormInput::from_urlencoded(fields.as_bytes()),
        )
    }

    #[test]
    fn parses_urlencoded_fields() {
        let input = FormInput::from_urlencoded(
            b"engine=anthropic&prompt=hello+there%21&decorators=a.md%0Ab.md&action=respond&extra=1",
        );
        assert_eq!(input.engine.as_deref(), Some("anthropic"));
        assert_eq!(input.prompt.as_deref(), Some("hello there!"));
        assert_eq!(input.decorators.as_deref(), Some("a.md\nb.md"));
        assert!(input.wants_reply());
        assert!(!FormInput::default().wants_reply());
    }

    #[test]
    fn empty_form_uses_catalog_defaults() {
        let state = resolve("");
        assert_eq!(state.engine.name, "openai");
        assert_eq!(state.model, "gpt-4o");
        assert_eq!(state.temperature_option, TemperaturePreset::Creative);
        assert_eq!(state.temperature, 0.80);
        assert_eq!(state.default_temperature, 0.75);
        assert_eq!(state.max_tokens_option, MaxTokensOption::Preset(2048));
        assert_eq!(state.max_tokens, 2048);
        assert_eq!(state.decorator_text, "a.md\ndir");
        assert_eq!(state.decorator_paths(), vec!["a.md", "dir"]);
        assert!(state.notices.is_empty());
    }

    #[test]
    fn model_resets_when_engine_changes() {
        let state = resolve("engine=anthropic&model=gpt-4o");
        assert_eq!(state.engine.name, "anthropic");
        assert_eq!(state.model, "claude-sonnet-4-0");
        assert_eq!(state.default_temperature, 0.0);
        // 512 is a listed choice
        assert_eq!(state.max_tokens_option, MaxTokensOption::Preset(512));
    }

    #[test]
    fn unlisted_default_selects_custom() {
        let state = resolve("model=gpt-4o-mini");
        assert_eq!(state.default_max_tokens, 4096);
        assert_eq!(state.max_tokens_option, MaxTokensOption::Custom);
        assert_eq!(state.max_tokens, 4096);
    }

    #[test]
    fn presets_and_custom_values() {
        let state = resolve("temperature_option=precise&max_tokens_option=256");
        assert_eq!(state.temperature, 0.10);
        assert_eq!(state.max_tokens, 256);

        let state = resolve(
            "temperature_option=custom&custom_temperature=0.33&max_tokens_option=custom&custom_max_tokens=999",
        );
        assert_eq!(state.temperature, 0.33);
        assert_eq!(state.max_tokens, 999);
        assert!(state.notices.is_empty());

        let state = resolve("temperature_option=custom");
        assert_eq!(state.temperature, 0.75);
    }

    #[test]
    fn out_of_range_custom_values_are_rejected() {
        let state = resolve(
            "temperature_option=custom&custom_temperature=1.5&max_tokens_option=custom&custom_max_tokens=70000",
        );
        assert_eq!(state.temperature, 0.75);
        assert_eq!(state.max_tokens, 2048);
        assert_eq!(state.notices.len(), 2);

        let state = resolve("temperature_option=custom&custom_temperature=warm");
        assert_eq!(state.temperature, 0.75);
        assert_eq!(state.notices.len(), 1);
    }

    #[test]
    fn labels_show_preset_values() {
        let settings = *sample().temperature_settings();
        let labels: Vec<String> = TemperaturePreset::ALL
            .iter()
            .map(|preset| preset.label(&settings))
            .collect();
        assert_eq!(
            labels,
            vec![
                "creative leaning (0.8)",
                "balanced (0.4)",
                "precise leaning (0.1)",
                "custom"
            ]
        );
        assert_eq!(
            MaxTokensOption::all()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec!["256", "512", "1024", "2048", "custom"]
        );
        assert_eq!(MaxTokensOption::from_key("300"), None);
    }
}
