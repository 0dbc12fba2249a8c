//! The `rbot-web` browser front-end.
//!
//! A single HTML form chooses the engine, model, creativity temperature,
//! max tokens and decorators, and submits one prompt at a time. Each
//! response is a fresh conversation: the form keeps no history.

mod form;
mod page;
mod server;

pub use form::{
    FormInput, FormState, MAX_TOKEN_CHOICES, MAX_TOKENS_RANGE, MAX_TOKENS_STEP, MaxTokensOption,
    RESPOND_ACTION, TEMPERATURE_RANGE, TEMPERATURE_STEP, TemperaturePreset,
};
pub use page::{Outcome, escape_html, format_timestamp, render_page, status_line};
pub use server::{
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT, HttpRequest, HttpResponse, WebServer,
    read_request, reject_free_args,
};
