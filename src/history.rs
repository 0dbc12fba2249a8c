//! Conversation history and saved sessions.
//!
//! A saved session is a JSON array of `{"role", "content"}` objects stored
//! under `<data_dir>/sessions/`. Session names may contain subdirectories
//! but never leave the sessions directory.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use crate::decorators::DecoratorSet;
use crate::error::{Error, Result};
use crate::observability::{SESSIONS_LOADED, SESSIONS_SAVED};
use crate::types::Message;

/// Ordered conversation history. Messages are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// A history that starts with one `system` message per decorator.
    pub fn from_decorators(decorators: &DecoratorSet) -> Self {
        Self {
            messages: decorators.to_messages(),
        }
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in conversation order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the history has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<Message>> for History {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// The directory of saved sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// A store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store for an application data directory (`<data_dir>/sessions`).
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("sessions"))
    }

    /// The sessions directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a session name onto a path inside the sessions directory.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty names, absolute paths, and names
    /// with `..` components.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation(
                "session name is empty",
                Some("session".to_string()),
            ));
        }
        let relative = Path::new(name);
        let mut resolved = self.root.clone();
        let mut named = false;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    named = true;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::validation(
                        format!("session name {name} must stay inside the sessions directory"),
                        Some("session".to_string()),
                    ));
                }
            }
        }
        if !named {
            return Err(Error::validation(
                format!("session name {name} does not name a file"),
                Some("session".to_string()),
            ));
        }
        Ok(resolved)
    }

    /// Loads a saved session.
    pub fn load(&self, name: &str) -> Result<History> {
        let path = self.resolve(name)?;
        let file = File::open(&path).map_err(|err| {
            Error::io(format!("failed to open session {}", path.display()), err)
        })?;
        let history: History = from_reader(BufReader::new(file)).map_err(|err| {
            Error::serialization(
                format!("failed to parse session {}", path.display()),
                Some(Box::new(err)),
            )
        })?;
        SESSIONS_LOADED.click();
        tracing::info!(path = %path.display(), messages = history.len(), "loaded session");
        Ok(history)
    }

    /// Writes `history` under `name`, creating parent directories and
    /// overwriting any existing file. Returns the path written.
    pub fn save(&self, name: &str, history: &History) -> Result<PathBuf> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                Error::io(format!("failed to create {}", parent.display()), err)
            })?;
        }
        let file = File::create(&path).map_err(|err| {
            Error::io(format!("failed to create session {}", path.display()), err)
        })?;
        let mut writer = BufWriter::new(file);
        to_writer_pretty(&mut writer, history).map_err(|err| {
            Error::serialization("failed to serialize session", Some(Box::new(err)))
        })?;
        writer.flush()?;
        SESSIONS_SAVED.click();
        tracing::info!(path = %path.display(), messages = history.len(), "saved session");
        Ok(path)
    }

    /// Every file under the sessions directory, relative to it and sorted.
    ///
    /// A missing sessions directory lists as empty.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if self.root.is_dir() {
            list_into(&self.root, &self.root, &mut files)?;
        }
        files.sort();
        Ok(files)
    }
}

fn list_into(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            list_into(root, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_data_dir(dir.path());
        (dir, store)
    }

    #[test]
    fn history_starts_with_decorators() {
        let decorators = DecoratorSet::from_texts(vec!["one".into(), "two".into()]);
        let mut history = History::from_decorators(&decorators);
        history.push(Message::user("hi"));
        assert_eq!(
            history.messages(),
            &[
                Message::system("one"),
                Message::system("two"),
                Message::user("hi")
            ]
        );
    }

    #[test]
    fn loads_plain_json_array() {
        let (_dir, store) = store();
        fs::create_dir_all(store.root()).unwrap();
        fs::write(
            store.root().join("session.json"),
            r#"[{"role":"system","content":"X"},{"role":"user","content":"Y"}]"#,
        )
        .unwrap();
        let history = store.load(" session.json ").unwrap();
        assert_eq!(
            history.messages(),
            &[Message::system("X"), Message::user("Y")]
        );
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = store();
        let history = History::from(vec![
            Message::system("decorator"),
            Message::user("question"),
            Message::assistant("answer with \"quotes\"\nand lines"),
        ]);
        let path = store.save("work/today.json", &history).unwrap();
        assert_eq!(path, store.root().join("work").join("today.json"));
        assert_eq!(store.load("work/today.json").unwrap(), history);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(json.is_array());
    }

    #[test]
    fn save_overwrites() {
        let (_dir, store) = store();
        store
            .save("a.json", &History::from(vec![Message::user("first")]))
            .unwrap();
        store
            .save("a.json", &History::from(vec![Message::user("second")]))
            .unwrap();
        assert_eq!(
            store.load("a.json").unwrap().messages(),
            &[Message::user("second")]
        );
    }

    #[test]
    fn rejects_names_outside_the_store() {
        let (_dir, store) = store();
        for name in ["../escape.json", "/etc/passwd", "a/../../b", "", "  ", "."] {
            let err = store.resolve(name).unwrap_err();
            assert!(err.is_validation(), "{name}: {err}");
        }
        assert!(store.resolve("./ok.json").is_ok());
    }

    #[test]
    fn missing_or_malformed_sessions_fail() {
        let (_dir, store) = store();
        assert!(store.load("nope.json").unwrap_err().is_io());
        fs::create_dir_all(store.root()).unwrap();
        fs::write(store.root().join("bad.json"), "{not json").unwrap();
        assert!(matches!(
            store.load("bad.json").unwrap_err(),
            Error::Serialization { .. }
        ));
    }

    #[test]
    fn lists_saved_files_recursively() {
        let (_dir, store) = store();
        assert!(store.list().unwrap().is_empty());
        let history = History::new();
        store.save("b.json", &history).unwrap();
        store.save("a/c.json", &history).unwrap();
        assert_eq!(
            store.list().unwrap(),
            vec![PathBuf::from("a").join("c.json"), PathBuf::from("b.json")]
        );
    }
}
