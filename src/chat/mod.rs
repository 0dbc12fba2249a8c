//! The `rbot` chat front-end.
//!
//! This module drives a conversation from the command line. It supports:
//!
//! - A batch mode that sends one prompt and prints the reply
//! - An interactive loop with `/quit` and `/save` commands
//! - Continuing a saved session with `--load`
//!
//! # Architecture
//!
//! - [`ChatArgs`] and [`ChatConfig`]: CLI argument parsing and resolution
//! - [`ChatSession`]: conversation state and dispatch
//! - [`parse_command`]: slash command parsing
//! - [`run`]: the top-level flow shared by the binary and the tests

mod app;
mod batch;
mod commands;
mod config;
mod interactive;
pub(crate) mod session;

pub use crate::render::{PlainTextRenderer, RecordingRenderer, Renderer};
pub use app::{ChatIo, EXIT_NO_PROMPT, EXIT_USAGE, run};
pub use batch::{NO_PROMPT_MESSAGE, read_prompt, run_batch};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, USAGE_BRIEF};
pub use interactive::{
    LineSource, PROMPT_INSTRUCTIONS, REPLY_SPEAKER, ReadlineSource, ScriptedLines, run_interactive,
};
pub use session::{ChatSession, SessionOrigin};
