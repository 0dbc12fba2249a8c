//! Process-wide configuration shared by both front-ends.

use std::env;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::catalog::EngineCatalog;
use crate::decorators::{DECORATORS_ENV, parse_path_list};
use crate::error::{Error, Result};
use crate::history::SessionStore;

/// Environment variable naming the engine catalog file.
pub const ENGINES_ENV: &str = "RBOT_ENGINES";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "RBOT_DATA_DIR";

/// Catalog path used when `RBOT_ENGINES` is unset.
pub const DEFAULT_ENGINES_FILE: &str = "engines.yaml";

/// The loaded catalog, the data directory and the default decorator paths.
///
/// Built once at startup and passed by reference to everything that needs it.
#[derive(Debug, Clone)]
pub struct AppContext {
    catalog: EngineCatalog,
    data_dir: PathBuf,
    default_decorators: Vec<String>,
}

impl AppContext {
    /// A context with no default decorators.
    pub fn new(catalog: EngineCatalog, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            data_dir: data_dir.into(),
            default_decorators: Vec::new(),
        }
    }

    /// Replaces the default decorator paths.
    pub fn with_default_decorators(mut self, paths: Vec<String>) -> Self {
        self.default_decorators = paths;
        self
    }

    /// Builds the context from the environment.
    ///
    /// A `.env` file in the working directory is read first; variables that
    /// are already set take precedence over it.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        let catalog_path =
            env::var(ENGINES_ENV).unwrap_or_else(|_| DEFAULT_ENGINES_FILE.to_string());
        let catalog = EngineCatalog::from_file(&catalog_path)?;
        let data_dir = match env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => default_data_dir()?,
        };
        let default_decorators = env::var(DECORATORS_ENV)
            .map(|raw| parse_path_list(&raw))
            .unwrap_or_default();
        tracing::debug!(
            catalog = %catalog_path,
            data_dir = %data_dir.display(),
            decorators = default_decorators.len(),
            "application context ready"
        );
        Ok(Self {
            catalog,
            data_dir,
            default_decorators,
        })
    }

    /// The engine catalog.
    pub fn catalog(&self) -> &EngineCatalog {
        &self.catalog
    }

    /// The application data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The saved-session store under the data directory.
    pub fn sessions(&self) -> SessionStore {
        SessionStore::in_data_dir(&self.data_dir)
    }

    /// Decorator paths from `DECORATORS`, in order.
    pub fn default_decorators(&self) -> &[String] {
        &self.default_decorators
    }
}

/// The per-user data directory for rbot.
pub fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "Rajiv Pant", "rbot")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::config(
                format!("could not determine a home directory; set {DATA_DIR_ENV}"),
                None,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample;

    #[test]
    fn sessions_live_under_the_data_dir() {
        let context = AppContext::new(sample(), "/tmp/rbot-data");
        assert_eq!(context.data_dir(), Path::new("/tmp/rbot-data"));
        assert_eq!(
            context.sessions().root(),
            Path::new("/tmp/rbot-data/sessions")
        );
        assert!(context.default_decorators().is_empty());
    }

    #[test]
    fn default_decorators_are_kept_in_order() {
        let context = AppContext::new(sample(), "/tmp")
            .with_default_decorators(vec!["b.md".into(), "a.md".into()]);
        assert_eq!(context.default_decorators(), &["b.md", "a.md"]);
        assert_eq!(context.catalog().default_engine_name(), "openai");
    }
}
