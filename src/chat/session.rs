//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation
//! state for one run and drives the dispatcher one turn at a time.

use crate::chat::config::ChatConfig;
use crate::client::{ChatRequest, Dispatcher, PreambleState};
use crate::decorators::DecoratorSet;
use crate::error::Result;
use crate::history::History;
use crate::types::Message;

/// Where a session's history came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Started fresh from the decorators.
    New,
    /// Continued from a saved session file.
    Loaded,
}

/// A chat session that manages conversation state and API interactions.
pub struct ChatSession {
    config: ChatConfig,
    decorators: DecoratorSet,
    history: History,
    preamble: PreambleState,
    origin: SessionOrigin,
    turns: u64,
}

impl ChatSession {
    /// Starts a new session whose history holds one `system` message per
    /// decorator.
    pub fn new(config: ChatConfig, decorators: DecoratorSet) -> Self {
        let history = History::from_decorators(&decorators);
        Self {
            config,
            decorators,
            history,
            preamble: PreambleState::new(),
            origin: SessionOrigin::New,
            turns: 0,
        }
    }

    /// Continues a saved session. The loaded history replaces everything and
    /// no decorators are added.
    pub fn loaded(config: ChatConfig, history: History) -> Self {
        Self {
            config,
            decorators: DecoratorSet::empty(),
            history,
            preamble: PreambleState::new(),
            origin: SessionOrigin::Loaded,
            turns: 0,
        }
    }

    /// Sends one prompt and records both sides of the exchange.
    ///
    /// For a new session on an Anthropic engine the preamble state is reset
    /// after the turn, so the next request carries the system prompt again.
    pub async fn submit(&mut self, dispatcher: &dyn Dispatcher, prompt: &str) -> Result<String> {
        self.history.push(Message::user(prompt));
        let request = ChatRequest {
            prompt,
            decorators: self.decorators.texts(),
            history: self.history.messages(),
            engine: &self.config.engine,
            model: &self.config.model,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let reply = dispatcher.chat(request, &mut self.preamble).await?;
        self.history.push(Message::assistant(reply.clone()));
        self.turns += 1;
        if self.origin == SessionOrigin::New && self.config.is_anthropic() {
            self.preamble.reset();
        }
        Ok(reply)
    }

    /// Marks the preamble as undelivered.
    pub fn reset_preamble(&mut self) {
        self.preamble.reset();
    }

    /// The resolved configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The conversation so far.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The decorators the session started with.
    pub fn decorators(&self) -> &DecoratorSet {
        &self.decorators
    }

    /// Whether the session is new or loaded.
    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    /// The provider preamble state.
    pub fn preamble(&self) -> PreambleState {
        self.preamble
    }

    /// Number of completed turns.
    pub fn turns(&self) -> u64 {
        self.turns
    }
}
