//! One-shot batch mode.

use std::fs;
use std::io::Read;

use crate::chat::config::ChatArgs;
use crate::chat::session::ChatSession;
use crate::client::Dispatcher;
use crate::error::{Error, Result};
use crate::output::batch_output;
use crate::render::Renderer;

/// Reported when batch mode has nothing to send.
pub const NO_PROMPT_MESSAGE: &str =
    "No prompt provided. Please provide a prompt using -p, -f, or -i option.";

/// Resolves the batch prompt from `--prompt`, `--prompt_file` or `--stdin`.
///
/// Prompt files and stdin are trimmed. Returns `None` when no source is
/// given or the source is empty.
pub fn read_prompt(args: &ChatArgs, stdin: &mut dyn Read) -> Result<Option<String>> {
    let prompt = if let Some(prompt) = &args.prompt {
        prompt.clone()
    } else if let Some(path) = &args.prompt_file {
        fs::read_to_string(path)
            .map_err(|err| {
                Error::io(format!("failed to read prompt file {}", path.display()), err)
            })?
            .trim()
            .to_string()
    } else if args.stdin {
        let mut buf = String::new();
        stdin
            .read_to_string(&mut buf)
            .map_err(|err| Error::io("failed to read prompt from stdin", err))?;
        buf.trim().to_string()
    } else {
        return Ok(None);
    };
    if prompt.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(prompt))
    }
}

/// Sends a single prompt and prints the reply.
///
/// When the reply carries an `OUTPUT="""..."""` marker only its payload is
/// printed. Returns the full reply.
pub async fn run_batch(
    session: &mut ChatSession,
    prompt: &str,
    dispatcher: &dyn Dispatcher,
    renderer: &mut dyn Renderer,
) -> Result<String> {
    if session.config().is_anthropic() {
        session.reset_preamble();
    }
    let reply = session.submit(dispatcher, prompt).await?;
    renderer.print_reply(None, batch_output(&reply));
    Ok(reply)
}
