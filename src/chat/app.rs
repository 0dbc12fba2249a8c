//! The `rbot` command-line front-end.

use std::io::Read;

use crate::chat::batch::{NO_PROMPT_MESSAGE, read_prompt, run_batch};
use crate::chat::config::{ChatArgs, ChatConfig};
use crate::chat::interactive::{LineSource, run_interactive};
use crate::chat::session::ChatSession;
use crate::client::Dispatcher;
use crate::context::AppContext;
use crate::decorators::{DecoratorSet, merge_paths};
use crate::error::Result;
use crate::render::Renderer;

/// Exit status when batch mode has no prompt.
pub const EXIT_NO_PROMPT: i32 = 1;

/// Exit status for usage errors.
pub const EXIT_USAGE: i32 = 2;

/// The console endpoints a run reads from and writes to.
pub struct ChatIo<'a> {
    /// Interactive input.
    pub lines: &'a mut dyn LineSource,
    /// Batch `--stdin` input.
    pub stdin: &'a mut dyn Read,
    /// All output.
    pub renderer: &'a mut dyn Renderer,
}

/// Runs `rbot` for parsed arguments and returns the process exit status.
///
/// Usage errors, such as an unknown engine, are returned before anything is
/// dispatched; callers map them to [`EXIT_USAGE`].
pub async fn run(
    args: &ChatArgs,
    context: &AppContext,
    dispatcher: &dyn Dispatcher,
    io: ChatIo<'_>,
) -> Result<i32> {
    let ChatIo {
        lines,
        stdin,
        renderer,
    } = io;

    if args.list_saved {
        for path in context.sessions().list()? {
            renderer.print_reply(None, &path.display().to_string());
        }
        return Ok(0);
    }

    let config = ChatConfig::from_args(context.catalog(), args)?;

    let decorators = if args.skips_decorators() {
        DecoratorSet::empty()
    } else {
        DecoratorSet::load(&merge_paths(context.default_decorators(), &args.decorators))?
    };
    if decorators.files().is_empty() {
        renderer.print_info("No decorator files are being used.");
    } else {
        renderer.print_info("Decorators being used:");
        for file in decorators.files() {
            renderer.print_info(&format!(" - {}", file.display()));
        }
    }

    let store = context.sessions();
    let mut session = match &args.load {
        Some(name) => {
            let history = store.load(name)?;
            renderer.print_info(&format!(
                "Continuing previously saved session from file: {}",
                name.trim()
            ));
            ChatSession::loaded(config, history)
        }
        None => ChatSession::new(config, decorators),
    };

    let config = session.config();
    renderer.print_info(&format!(
        "Using AI engine {} with model {}",
        config.engine.name, config.model
    ));
    renderer.print_info(&format!(
        "Creativity temperature setting: {}",
        config.temperature
    ));
    renderer.print_info(&format!("Max tokens setting: {}", config.max_tokens));

    if args.is_interactive() {
        renderer.print_info("Entering interactive mode.");
        run_interactive(&mut session, lines, dispatcher, &store, renderer).await?;
        return Ok(0);
    }

    let Some(prompt) = read_prompt(args, stdin)? else {
        renderer.print_error(NO_PROMPT_MESSAGE);
        return Ok(EXIT_NO_PROMPT);
    };
    run_batch(&mut session, &prompt, dispatcher, renderer).await?;
    Ok(0)
}
