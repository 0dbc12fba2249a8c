//! The engine catalog loaded from `engines.yaml`.
//!
//! The catalog names every engine the front-ends may select, the models each
//! engine offers, and the per-model temperature and max-token defaults. A
//! minimal file looks like:
//!
//! ```yaml
//! default: openai
//! temperature_settings:
//!   precise: 0.20
//!   balanced: 0.50
//!   creative: 0.75
//! engines:
//!   - name: openai
//!     default_model: gpt-4o
//!     api_key_name: OPENAI_API_KEY
//!     models:
//!       - name: gpt-4o
//!         temperature: 0.75
//!         max_tokens: 2048
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{EngineDescriptor, TemperatureSettings};

/// Temperature used when the requested model is not in the catalog.
pub const FALLBACK_TEMPERATURE: f32 = 0.75;

/// Max tokens used when the requested model is not in the catalog.
pub const FALLBACK_MAX_TOKENS: u32 = 1024;

/// Engine selected when the catalog declares no `default`.
pub const DEFAULT_ENGINE: &str = "openai";

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    temperature_settings: TemperatureSettings,
    engines: Vec<EngineDescriptor>,
}

/// Generation defaults for one engine/model pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelDefaults {
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl ModelDefaults {
    /// The defaults used for models missing from the catalog.
    pub const FALLBACK: ModelDefaults = ModelDefaults {
        temperature: FALLBACK_TEMPERATURE,
        max_tokens: FALLBACK_MAX_TOKENS,
    };

    /// Applies explicit overrides. A present override always wins, including
    /// a temperature of `0.0`.
    pub fn with_overrides(self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        Self {
            temperature: temperature.unwrap_or(self.temperature),
            max_tokens: max_tokens.unwrap_or(self.max_tokens),
        }
    }
}

/// All configured engines, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCatalog {
    default_engine: String,
    temperature_settings: TemperatureSettings,
    engines: Vec<EngineDescriptor>,
}

impl EngineCatalog {
    /// Builds a catalog from already-parsed descriptors.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when there are no engines, when an engine
    /// is listed twice, when a model default is out of range, or when the
    /// default engine is not one of the listed engines.
    pub fn new(
        default_engine: Option<String>,
        temperature_settings: TemperatureSettings,
        engines: Vec<EngineDescriptor>,
    ) -> Result<Self> {
        if engines.is_empty() {
            return Err(Error::config("engine catalog lists no engines", None));
        }
        for (idx, engine) in engines.iter().enumerate() {
            if engines[..idx].iter().any(|other| other.name == engine.name) {
                return Err(Error::config(
                    format!("engine {} is listed more than once", engine.name),
                    None,
                ));
            }
            for model in &engine.models {
                if !(0.0..=1.0).contains(&model.temperature) {
                    return Err(Error::config(
                        format!(
                            "model {} of engine {} has temperature {} outside [0, 1]",
                            model.name, engine.name, model.temperature
                        ),
                        None,
                    ));
                }
                if model.max_tokens == 0 {
                    return Err(Error::config(
                        format!(
                            "model {} of engine {} has max_tokens of zero",
                            model.name, engine.name
                        ),
                        None,
                    ));
                }
            }
        }
        let default_engine = match default_engine {
            Some(name) => {
                if !engines.iter().any(|engine| engine.name == name) {
                    return Err(Error::config(
                        format!("default engine {name} is not a configured engine"),
                        None,
                    ));
                }
                name
            }
            None if engines.iter().any(|engine| engine.name == DEFAULT_ENGINE) => {
                DEFAULT_ENGINE.to_string()
            }
            None => engines[0].name.clone(),
        };
        Ok(Self {
            default_engine,
            temperature_settings,
            engines,
        })
    }

    /// Parses a catalog from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.default, file.temperature_settings, file.engines)
    }

    /// Loads a catalog from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|err| {
            Error::io(
                format!("failed to read engine catalog {}", path.display()),
                err,
            )
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Looks up an engine by name.
    pub fn engine(&self, name: &str) -> Option<&EngineDescriptor> {
        self.engines.iter().find(|engine| engine.name == name)
    }

    /// All engines in file order.
    pub fn engines(&self) -> &[EngineDescriptor] {
        &self.engines
    }

    /// Engine names in file order; the valid `--engine` choices.
    pub fn engine_names(&self) -> Vec<&str> {
        self.engines
            .iter()
            .map(|engine| engine.name.as_str())
            .collect()
    }

    /// The engine used when none is requested.
    pub fn default_engine_name(&self) -> &str {
        &self.default_engine
    }

    /// The engine used when none is requested.
    pub fn default_engine(&self) -> &EngineDescriptor {
        // construction guarantees at least one engine
        self.engine(&self.default_engine)
            .unwrap_or(&self.engines[0])
    }

    /// Temperature presets for the web form.
    pub fn temperature_settings(&self) -> &TemperatureSettings {
        &self.temperature_settings
    }

    /// Resolves the generation defaults for an engine/model pair.
    ///
    /// The model is matched by exact name within the engine's model list. An
    /// unknown engine or model yields [`ModelDefaults::FALLBACK`].
    pub fn resolve_defaults(&self, engine: &str, model: &str) -> ModelDefaults {
        self.engine(engine)
            .and_then(|engine| engine.model(model))
            .map(|model| ModelDefaults {
                temperature: model.temperature,
                max_tokens: model.max_tokens,
            })
            .unwrap_or(ModelDefaults::FALLBACK)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"
default: openai
temperature_settings:
  precise: 0.10
  balanced: 0.40
  creative: 0.80
engines:
  - name: openai
    default_model: gpt-4o
    api_key_name: OPENAI_API_KEY
    models:
      - name: gpt-4o
        temperature: 0.75
        max_tokens: 2048
      - name: gpt-4o-mini
        temperature: 0.5
        max_tokens: 4096
  - name: anthropic
    default_model: claude-sonnet-4-0
    api_key_name: ANTHROPIC_API_KEY
    models:
      - name: claude-sonnet-4-0
        temperature: 0.0
        max_tokens: 512
"#;

    pub(crate) fn sample() -> EngineCatalog {
        EngineCatalog::from_yaml_str(SAMPLE).unwrap()
    }

    #[test]
    fn parses_engines_in_file_order() {
        let catalog = sample();
        assert_eq!(catalog.engine_names(), vec!["openai", "anthropic"]);
        assert_eq!(catalog.default_engine_name(), "openai");
        assert_eq!(catalog.default_engine().default_model, "gpt-4o");
        assert_eq!(catalog.temperature_settings().creative, 0.80);
        assert_eq!(
            catalog.engine("anthropic").unwrap().default_model,
            "claude-sonnet-4-0"
        );
    }

    #[test]
    fn bundled_engines_file_loads() {
        let catalog =
            EngineCatalog::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/engines.yaml")).unwrap();
        assert_eq!(catalog.default_engine_name(), "openai");
        for engine in catalog.engines() {
            assert!(engine.model(&engine.default_model).is_some());
        }
    }

    #[test]
    fn resolves_every_configured_model() {
        let catalog = sample();
        for engine in catalog.engines() {
            for model in &engine.models {
                let defaults = catalog.resolve_defaults(&engine.name, &model.name);
                assert_eq!(defaults.temperature, model.temperature);
                assert_eq!(defaults.max_tokens, model.max_tokens);
            }
        }
    }

    #[test]
    fn unknown_pairs_fall_back() {
        let catalog = sample();
        assert_eq!(
            catalog.resolve_defaults("openai", "gpt-2"),
            ModelDefaults::FALLBACK
        );
        assert_eq!(
            catalog.resolve_defaults("cohere", "gpt-4o"),
            ModelDefaults {
                temperature: 0.75,
                max_tokens: 1024
            }
        );
        // models belong to exactly one engine
        assert_eq!(
            catalog.resolve_defaults("anthropic", "gpt-4o"),
            ModelDefaults::FALLBACK
        );
    }

    #[test]
    fn overrides_win_including_zero() {
        let defaults = sample().resolve_defaults("openai", "gpt-4o");
        assert_eq!(
            defaults.with_overrides(Some(0.0), None),
            ModelDefaults {
                temperature: 0.0,
                max_tokens: 2048
            }
        );
        assert_eq!(
            defaults.with_overrides(None, Some(1)),
            ModelDefaults {
                temperature: 0.75,
                max_tokens: 1
            }
        );
        assert_eq!(defaults.with_overrides(None, None), defaults);
    }

    #[test]
    fn default_engine_is_inferred() {
        let yaml = r#"
engines:
  - name: anthropic
    default_model: claude
  - name: openai
    default_model: gpt-4o
"#;
        let catalog = EngineCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.default_engine_name(), "openai");
        assert_eq!(catalog.temperature_settings().precise, 0.20);

        let yaml = r#"
engines:
  - name: anthropic
    default_model: claude
"#;
        let catalog = EngineCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.default_engine_name(), "anthropic");
    }

    #[test]
    fn rejects_inconsistent_catalogs() {
        let missing_default = r#"
default: cohere
engines:
  - name: openai
    default_model: gpt-4o
"#;
        assert!(
            EngineCatalog::from_yaml_str(missing_default)
                .unwrap_err()
                .is_config()
        );

        let hot_model = r#"
engines:
  - name: openai
    default_model: gpt-4o
    models:
      - name: gpt-4o
        temperature: 1.5
        max_tokens: 10
"#;
        assert!(EngineCatalog::from_yaml_str(hot_model).unwrap_err().is_config());

        assert!(EngineCatalog::from_yaml_str("engines: []").unwrap_err().is_config());
        assert!(EngineCatalog::from_yaml_str("engines: [").unwrap_err().is_config());
    }
}
