//! The interactive read-eval-print loop.

use std::collections::VecDeque;
use std::io;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::chat::commands::{ChatCommand, help_text, parse_command};
use crate::chat::session::ChatSession;
use crate::client::Dispatcher;
use crate::error::{Error, Result};
use crate::history::SessionStore;
use crate::render::Renderer;

/// Instructions printed before every prompt.
pub const PROMPT_INSTRUCTIONS: &str =
    "Enter prompt below. /quit to exit or /save file_name.json to save conversation.";

/// Name printed in front of each reply.
pub const REPLY_SPEAKER: &str = "rbot";

/// A source of input lines.
pub trait LineSource {
    /// Reads one line, showing `prompt`. Returns `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Console input through `rustyline`, with in-memory line history.
///
/// The editor is created on first use so that constructing the source never
/// touches the terminal.
#[derive(Default)]
pub struct ReadlineSource {
    editor: Option<DefaultEditor>,
}

impl ReadlineSource {
    /// A source that reads from the terminal.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LineSource for ReadlineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        if self.editor.is_none() {
            self.editor = Some(DefaultEditor::new().map_err(readline_error)?);
        }
        let Some(editor) = self.editor.as_mut() else {
            return Ok(None);
        };
        match editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(readline_error(err)),
        }
    }
}

fn readline_error(err: ReadlineError) -> Error {
    match err {
        ReadlineError::Io(err) => Error::io("failed to read input", err),
        other => Error::io("failed to read input", io::Error::other(other.to_string())),
    }
}

/// Lines supplied up front; used for piped input and tests.
#[derive(Debug, Default, Clone)]
pub struct ScriptedLines {
    lines: VecDeque<String>,
}

impl ScriptedLines {
    /// A source that yields `lines` in order, then end of input.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineSource for ScriptedLines {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// Runs the interactive loop until `/quit` or end of input.
///
/// `/save <name>` writes the history into `store`; an invalid name is
/// reported and the loop continues. Any other non-empty line is sent to the
/// model and the reply printed as `rbot: <reply>`. Dispatcher and I/O errors
/// end the loop and are returned.
pub async fn run_interactive(
    session: &mut ChatSession,
    lines: &mut dyn LineSource,
    dispatcher: &dyn Dispatcher,
    store: &SessionStore,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    loop {
        renderer.print_info("");
        renderer.print_info(PROMPT_INSTRUCTIONS);
        let Some(line) = lines.read_line("> ")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Some(ChatCommand::Quit) => break,
            Some(ChatCommand::Help) => renderer.print_info(help_text()),
            Some(ChatCommand::Invalid(message)) => renderer.print_error(&message),
            Some(ChatCommand::Save(name)) => match store.save(&name, session.history()) {
                Ok(path) => {
                    renderer.print_info(&format!("Conversation saved to {}", path.display()))
                }
                Err(err) if err.is_validation() => renderer.print_error(&err.to_string()),
                Err(err) => return Err(err),
            },
            None => {
                let reply = session.submit(dispatcher, line).await?;
                renderer.print_reply(Some(REPLY_SPEAKER), &reply);
            }
        }
    }
    Ok(())
}
