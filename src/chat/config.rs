//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `getopts` and the resolved
//! per-run generation settings.

use std::path::PathBuf;

use getopts::Options;

use crate::catalog::EngineCatalog;
use crate::error::{Error, Result};
use crate::types::{EngineDescriptor, ProviderKind};

/// Usage line printed above the option table.
pub const USAGE_BRIEF: &str = "Usage: rbot [OPTIONS]";

/// Multi-letter short flags accepted for compatibility, and their long forms.
const MULTI_LETTER_FLAGS: &[(&str, &str)] = &[
    ("-ls", "--list-saved"),
    ("-nd", "--nodecorator"),
    ("-mt", "--max_tokens"),
];

/// Command-line arguments for the rbot tool.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChatArgs {
    /// List saved sessions and exit.
    pub list_saved: bool,
    /// Prompt text for batch mode.
    pub prompt: Option<String>,
    /// File holding the prompt for batch mode.
    pub prompt_file: Option<PathBuf>,
    /// Read the prompt for batch mode from stdin.
    pub stdin: bool,
    /// Start an interactive session.
    pub interactive: bool,
    /// Decorator files or directories, after the `DECORATORS` defaults.
    pub decorators: Vec<String>,
    /// Skip decorators entirely.
    pub no_decorator: bool,
    /// Engine name.
    pub engine: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Temperature override.
    pub temperature: Option<f32>,
    /// Max-tokens override.
    pub max_tokens: Option<u32>,
    /// Saved session to continue.
    pub load: Option<String>,
    /// Print usage and exit.
    pub help: bool,
}

impl ChatArgs {
    /// The option table.
    pub fn options() -> Options {
        let mut opts = Options::new();
        opts.optflag("", "list-saved", "List saved sessions (also -ls)");
        opts.optopt("p", "prompt", "Prompt text", "PROMPT");
        opts.optopt("f", "prompt_file", "Read the prompt from a file", "FILE");
        opts.optflag("", "stdin", "Read the prompt from standard input");
        opts.optflag("i", "interactive", "Start an interactive session");
        opts.optmulti(
            "d",
            "decorator",
            "Decorator file or directory; repeatable",
            "PATH",
        );
        opts.optflag("", "nodecorator", "Do not use decorators (also -nd)");
        opts.optopt("e", "engine", "AI engine to use", "ENGINE");
        opts.optopt("m", "model", "Model to use", "MODEL");
        opts.optopt("t", "temperature", "Sampling temperature, 0.0 to 1.0", "TEMP");
        opts.optopt(
            "",
            "max_tokens",
            "Maximum tokens to generate (also -mt)",
            "N",
        );
        opts.optopt("l", "load", "Continue a saved session", "FILE");
        opts.optflag("h", "help", "Print this help");
        opts
    }

    /// The full usage text.
    pub fn usage() -> String {
        Self::options().usage(USAGE_BRIEF)
    }

    /// Parses arguments, not including the program name.
    ///
    /// # Errors
    ///
    /// Returns a usage error for unknown options, malformed values, stray
    /// positional arguments, and conflicting prompt sources.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = normalize(args);
        let matches = Self::options()
            .parse(&normalized)
            .map_err(|e| Error::usage(e.to_string()))?;
        if !matches.free.is_empty() {
            return Err(Error::usage(format!(
                "unrecognized arguments: {}",
                matches.free.join(" ")
            )));
        }

        let temperature = match matches.opt_str("temperature") {
            Some(raw) => Some(parse_temperature(&raw)?),
            None => None,
        };
        let max_tokens = match matches.opt_str("max_tokens") {
            Some(raw) => Some(parse_max_tokens(&raw)?),
            None => None,
        };

        let args = Self {
            list_saved: matches.opt_present("list-saved"),
            prompt: matches.opt_str("prompt"),
            prompt_file: matches.opt_str("prompt_file").map(PathBuf::from),
            stdin: matches.opt_present("stdin"),
            interactive: matches.opt_present("interactive"),
            decorators: matches.opt_strs("decorator"),
            no_decorator: matches.opt_present("nodecorator"),
            engine: matches.opt_str("engine"),
            model: matches.opt_str("model"),
            temperature,
            max_tokens,
            load: matches.opt_str("load"),
            help: matches.opt_present("help"),
        };
        args.check_prompt_sources()?;
        Ok(args)
    }

    fn check_prompt_sources(&self) -> Result<()> {
        let sources: Vec<&str> = [
            (self.prompt.is_some(), "--prompt"),
            (self.prompt_file.is_some(), "--prompt_file"),
            (self.stdin, "--stdin"),
        ]
        .into_iter()
        .filter_map(|(present, name)| present.then_some(name))
        .collect();
        if sources.len() > 1 {
            return Err(Error::usage(format!(
                "{} are mutually exclusive",
                sources.join(", ")
            )));
        }
        if let Some(source) = sources.first() {
            if self.interactive {
                return Err(Error::usage(format!(
                    "{source} cannot be combined with --interactive"
                )));
            }
            if self.load.is_some() {
                return Err(Error::usage(format!(
                    "{source} cannot be combined with --load, which starts an interactive session"
                )));
            }
        }
        Ok(())
    }

    /// True when the run is interactive; loading a session implies it.
    pub fn is_interactive(&self) -> bool {
        self.interactive || self.load.is_some()
    }

    /// True when decorators are skipped; loading a session implies it.
    pub fn skips_decorators(&self) -> bool {
        self.no_decorator || self.load.is_some()
    }
}

/// Rewrites argv into a form `getopts` understands.
///
/// Multi-letter short flags become their long forms, and every extra value
/// following a `-d`/`--decorator` value gets its own `--decorator`. A bare
/// `-d` followed by another flag is dropped rather than eating that flag.
fn normalize<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut iter = args
        .into_iter()
        .map(|arg| arg.as_ref().to_string())
        .peekable();
    let mut out = Vec::new();
    let mut decorator_run = false;
    while let Some(arg) = iter.next() {
        if arg == "--" {
            out.push(arg);
            out.extend(iter.by_ref());
            break;
        }
        if decorator_run && !arg.starts_with('-') {
            out.push("--decorator".to_string());
            out.push(arg);
            continue;
        }
        decorator_run = false;
        if arg == "-d" || arg == "--decorator" {
            // a bare flag names no decorators
            if let Some(value) = iter.next_if(|next| !next.starts_with('-')) {
                out.push(arg);
                out.push(value);
                decorator_run = true;
            }
            continue;
        }
        if arg.starts_with("--decorator=") || (arg.starts_with("-d") && arg.len() > 2) {
            out.push(arg);
            decorator_run = true;
            continue;
        }
        out.push(rewrite_multi_letter(&arg).unwrap_or(arg));
    }
    out
}

fn rewrite_multi_letter(arg: &str) -> Option<String> {
    MULTI_LETTER_FLAGS.iter().find_map(|(short, long)| {
        if arg == *short {
            Some(long.to_string())
        } else {
            arg.strip_prefix(short)
                .and_then(|rest| rest.strip_prefix('='))
                .map(|value| format!("{long}={value}"))
        }
    })
}

fn parse_temperature(raw: &str) -> Result<f32> {
    let value: f32 = raw
        .trim()
        .parse()
        .map_err(|_| Error::usage(format!("invalid temperature: {raw}")))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::usage(format!(
            "temperature {value} must be between 0.0 and 1.0"
        )));
    }
    Ok(value)
}

fn parse_max_tokens(raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(Error::usage(format!(
            "invalid max_tokens: {raw}; expected a positive integer"
        ))),
        Ok(value) => Ok(value),
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved engine, model and generation settings after
/// catalog defaults and command-line overrides have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The selected engine.
    pub engine: EngineDescriptor,

    /// The model to use for generating responses.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum tokens per response.
    pub max_tokens: u32,
}

impl ChatConfig {
    /// Resolves an engine/model pair against the catalog.
    ///
    /// A missing engine selects the catalog default and a missing model
    /// selects the engine's `default_model`. Temperature and max tokens come
    /// from the catalog, or the fallback when the model is not listed.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the engine is not in the catalog.
    pub fn resolve(
        catalog: &EngineCatalog,
        engine: Option<&str>,
        model: Option<&str>,
    ) -> Result<Self> {
        let engine_name = engine.unwrap_or_else(|| catalog.default_engine_name());
        let Some(engine) = catalog.engine(engine_name) else {
            return Err(Error::usage(format!(
                "unknown engine {engine_name}; choose from {}",
                catalog.engine_names().join(", ")
            )));
        };
        let model = model.unwrap_or(&engine.default_model).to_string();
        let defaults = catalog.resolve_defaults(&engine.name, &model);
        Ok(Self {
            engine: engine.clone(),
            model,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        })
    }

    /// Resolves the configuration for parsed command-line arguments.
    pub fn from_args(catalog: &EngineCatalog, args: &ChatArgs) -> Result<Self> {
        Ok(Self::resolve(catalog, args.engine.as_deref(), args.model.as_deref())?
            .with_temperature(args.temperature)
            .with_max_tokens(args.max_tokens))
    }

    /// Overrides the sampling temperature when a value is given.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        if let Some(temperature) = temperature {
            self.temperature = temperature;
        }
        self
    }

    /// Overrides the maximum tokens per response when a value is given.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        if let Some(max_tokens) = max_tokens {
            self.max_tokens = max_tokens;
        }
        self
    }

    /// The wire protocol of the selected engine.
    pub fn provider(&self) -> Option<ProviderKind> {
        self.engine.provider_kind()
    }

    /// True when the selected engine speaks the Anthropic protocol.
    pub fn is_anthropic(&self) -> bool {
        self.provider() == Some(ProviderKind::Anthropic)
    }
}
