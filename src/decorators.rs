//! Decorator loading.
//!
//! A decorator is a text file whose contents are sent ahead of the
//! conversation as a `system` message. Decorator paths come from the
//! `DECORATORS` environment variable (one path per line) followed by any
//! paths given explicitly on the command line or in the web form.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Message;

/// Environment variable holding newline-separated default decorator paths.
pub const DECORATORS_ENV: &str = "DECORATORS";

/// Splits a newline-separated path list, dropping blank lines.
pub fn parse_path_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Concatenates default and explicit decorator paths.
///
/// Defaults come first. Blank entries are removed; duplicates are kept.
pub fn merge_paths(defaults: &[String], explicit: &[String]) -> Vec<String> {
    defaults
        .iter()
        .chain(explicit.iter())
        .filter(|path| !path.trim().is_empty())
        .cloned()
        .collect()
}

/// Decorator texts together with the files they were read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoratorSet {
    texts: Vec<String>,
    files: Vec<PathBuf>,
}

impl DecoratorSet {
    /// An empty decorator set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a decorator set from in-memory texts with no backing files.
    pub fn from_texts(texts: Vec<String>) -> Self {
        Self {
            texts,
            files: Vec::new(),
        }
    }

    /// Reads every decorator named by `paths`, in order.
    ///
    /// A file contributes one decorator. A directory contributes one
    /// decorator per regular, non-hidden file beneath it, ordered by path.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a path does not exist or cannot be read.
    pub fn load<S: AsRef<str>>(paths: &[S]) -> Result<Self> {
        let mut set = Self::default();
        for path in paths {
            let path = Path::new(path.as_ref());
            let metadata = fs::metadata(path).map_err(|err| {
                Error::io(format!("decorator path {} not found", path.display()), err)
            })?;
            if metadata.is_dir() {
                let mut files = Vec::new();
                collect_files(path, &mut files)?;
                files.sort();
                for file in files {
                    set.push_file(file)?;
                }
            } else {
                set.push_file(path.to_path_buf())?;
            }
        }
        tracing::debug!(count = set.len(), "loaded decorators");
        Ok(set)
    }

    fn push_file(&mut self, file: PathBuf) -> Result<()> {
        let text = fs::read_to_string(&file).map_err(|err| {
            Error::io(format!("failed to read decorator {}", file.display()), err)
        })?;
        self.texts.push(text);
        self.files.push(file);
        Ok(())
    }

    /// Decorator texts in load order.
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Files the decorators were read from, in load order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of decorators.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Returns true if there are no decorators.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// One `system` message per decorator, preserving order.
    pub fn to_messages(&self) -> Vec<Message> {
        self.texts.iter().map(Message::system).collect()
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir)
        .map_err(|err| Error::io(format!("failed to list {}", dir.display()), err))?;
    for entry in entries {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    #[test]
    fn parse_drops_blank_lines() {
        let raw = "a.md\n\n  \nb.md\r\n";
        assert_eq!(parse_path_list(raw), vec!["a.md", "b.md"]);
        assert!(parse_path_list("").is_empty());
    }

    #[test]
    fn merge_keeps_order_and_duplicates() {
        let defaults = vec!["env.md".to_string(), "".to_string()];
        let explicit = vec!["cli.md".to_string(), " ".to_string(), "env.md".to_string()];
        assert_eq!(
            merge_paths(&defaults, &explicit),
            vec!["env.md", "cli.md", "env.md"]
        );
    }

    #[test]
    fn loads_files_and_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("single.md");
        fs::write(&single, "single").unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(nested.join("deeper")).unwrap();
        fs::write(nested.join("b.md"), "b").unwrap();
        fs::write(nested.join("a.md"), "a").unwrap();
        fs::write(nested.join(".hidden"), "hidden").unwrap();
        fs::write(nested.join("deeper").join("c.md"), "c").unwrap();

        let paths = vec![
            single.display().to_string(),
            nested.display().to_string(),
        ];
        let set = DecoratorSet::load(&paths).unwrap();
        assert_eq!(set.texts(), &["single", "a", "b", "c"]);
        assert_eq!(set.files()[0], single);
        assert_eq!(set.files()[3], nested.join("deeper").join("c.md"));

        let messages = set.to_messages();
        assert_eq!(messages.len(), 4);
        assert!(messages.iter().all(|m| m.role == MessageRole::System));
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.md").display().to_string();
        let err = DecoratorSet::load(&[missing]).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn empty_path_list_loads_nothing() {
        let set = DecoratorSet::load::<String>(&[]).unwrap();
        assert!(set.is_empty());
        assert!(set.files().is_empty());
    }
}
