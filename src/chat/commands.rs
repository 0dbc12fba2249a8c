//! Slash command parsing for the interactive loop.
//!
//! Only a handful of commands control the session; every other line,
//! including unrecognized `/words`, is sent to the model as a prompt.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Exit the chat application.
    Quit,

    /// Save the conversation under the sessions directory.
    Save(String),

    /// Display help information.
    Help,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be treated as a prompt. Command names are case-insensitive.
///
/// # Examples
///
/// ```
/// # use rbot::chat::{parse_command, ChatCommand};
/// assert_eq!(parse_command("/QUIT"), Some(ChatCommand::Quit));
/// assert_eq!(
///     parse_command("/save notes.json"),
///     Some(ChatCommand::Save("notes.json".to_string()))
/// );
/// assert!(parse_command("/unknown is just a prompt").is_none());
/// assert!(parse_command("Hello!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "quit" | "exit" => ChatCommand::Quit,
        "help" | "?" => ChatCommand::Help,
        "save" => match argument {
            Some(name) => ChatCommand::Save(name.to_string()),
            None => ChatCommand::Invalid("/save requires a file name".to_string()),
        },
        _ => return None,
    };

    Some(result)
}

/// Returns the help text listing the interactive commands.
pub fn help_text() -> &'static str {
    r#"Commands:
  /quit, /exit        Exit rbot
  /save <file_name>   Save the conversation under the sessions directory
  /help               Show this help

Any other line is sent to the model."#
}
