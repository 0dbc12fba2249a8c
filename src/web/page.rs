//! HTML rendering for the browser front-end.

use std::fmt::Write as _;

use time::OffsetDateTime;
use time::macros::format_description;

use crate::catalog::EngineCatalog;
use crate::web::form::{
    FormState, MAX_TOKENS_RANGE, MAX_TOKENS_STEP, MaxTokensOption, RESPOND_ACTION,
    TEMPERATURE_RANGE, TEMPERATURE_STEP, TemperaturePreset,
};

const PAGE_TITLE: &str = "rbot: AI augmented brain assistant";

const MAX_TOKENS_CAPTION: &str = "Max tokens is the maximum number of tokens to generate in the response. For English text, 100 tokens is on average about 75 words.";

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
label{display:block;margin-top:1rem;font-weight:600}\
select,input,textarea{width:100%;box-sizing:border-box;margin-top:.25rem}\
textarea{min-height:6rem}\
.caption{color:#666;font-size:.9rem}\
.notice{color:#8a5a00}\
.error{color:#b00020}\
.reply{white-space:pre-wrap;border-left:3px solid #ccc;padding-left:1rem}";

/// What came back from the last "Get response".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The model's reply.
    Reply(String),
    /// Why no reply could be produced.
    Error(String),
}

/// Formats `now` as `2021/January/01 01:01 AM (UTC)`.
pub fn format_timestamp(now: OffsetDateTime) -> String {
    let format = format_description!(
        "[year]/[month repr:long]/[day] [hour repr:12]:[minute] [period case:upper]"
    );
    let now = now.to_offset(time::UtcOffset::UTC);
    match now.format(format) {
        Ok(formatted) => format!("{formatted} (UTC)"),
        Err(_) => format!("{now} (UTC)"),
    }
}

/// The status line summarizing the current choices.
pub fn status_line(state: &FormState, now: OffsetDateTime) -> String {
    format!(
        "Using AI engine {} with model {}. Creativity temperature set to {} and max_tokens set to {}. The current date and time is {}.",
        state.engine.name,
        state.model,
        state.temperature,
        state.max_tokens,
        format_timestamp(now)
    )
}

/// Renders the whole page.
pub fn render_page(
    catalog: &EngineCatalog,
    state: &FormState,
    outcome: Option<&Outcome>,
    now: OffsetDateTime,
) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n<form method=\"post\" action=\"/\">\n",
        title = escape_html(PAGE_TITLE),
    );

    html.push_str("<label for=\"engine\">Choose an engine</label>\n");
    html.push_str("<select id=\"engine\" name=\"engine\" onchange=\"this.form.submit()\">\n");
    for name in catalog.engine_names() {
        push_option(&mut html, name, name, name == state.engine.name);
    }
    html.push_str("</select>\n");

    html.push_str("<label for=\"model\">Choose a model</label>\n");
    html.push_str("<select id=\"model\" name=\"model\" onchange=\"this.form.submit()\">\n");
    for model in state.model_choices() {
        push_option(&mut html, model, model, model == state.model);
    }
    html.push_str("</select>\n");

    html.push_str(
        "<label for=\"temperature_option\">Choose desired creativity option (called temperature)</label>\n",
    );
    html.push_str("<select id=\"temperature_option\" name=\"temperature_option\" onchange=\"this.form.submit()\">\n");
    for preset in TemperaturePreset::ALL {
        push_option(
            &mut html,
            preset.key(),
            &preset.label(&state.temperature_settings),
            preset == state.temperature_option,
        );
    }
    html.push_str("</select>\n");
    if state.temperature_option == TemperaturePreset::Custom {
        let (low, high) = TEMPERATURE_RANGE;
        let _ = write!(
            html,
            "<label for=\"custom_temperature\">Enter a custom temperature</label>\n<input type=\"number\" id=\"custom_temperature\" name=\"custom_temperature\" min=\"{low}\" max=\"{high}\" step=\"{TEMPERATURE_STEP}\" value=\"{}\">\n",
            state.temperature
        );
    }

    let _ = write!(
        html,
        "<p class=\"caption\">{}</p>\n<label for=\"max_tokens_option\">Choose max_tokens</label>\n",
        escape_html(MAX_TOKENS_CAPTION)
    );
    html.push_str("<select id=\"max_tokens_option\" name=\"max_tokens_option\" onchange=\"this.form.submit()\">\n");
    for option in MaxTokensOption::all() {
        let key = option.to_string();
        push_option(&mut html, &key, &key, option == state.max_tokens_option);
    }
    html.push_str("</select>\n");
    if state.max_tokens_option == MaxTokensOption::Custom {
        let (low, high) = MAX_TOKENS_RANGE;
        let _ = write!(
            html,
            "<label for=\"custom_max_tokens\">Enter a custom value for max_tokens</label>\n<input type=\"number\" id=\"custom_max_tokens\" name=\"custom_max_tokens\" min=\"{low}\" max=\"{high}\" step=\"{MAX_TOKENS_STEP}\" value=\"{}\">\n",
            state.max_tokens
        );
    }

    let _ = write!(
        html,
        "<label for=\"decorators\">Enter prompt context decorator path (files and/or directories)</label>\n<textarea id=\"decorators\" name=\"decorators\">{}</textarea>\n",
        escape_html(&state.decorator_text)
    );
    let _ = write!(
        html,
        "<label for=\"prompt\">Enter your prompt here</label>\n<textarea id=\"prompt\" name=\"prompt\">{}</textarea>\n",
        escape_html(&state.prompt)
    );

    for notice in &state.notices {
        let _ = writeln!(html, "<p class=\"notice\">{}</p>", escape_html(notice));
    }
    let _ = writeln!(
        html,
        "<p class=\"status\">{}</p>",
        escape_html(&status_line(state, now))
    );
    let _ = writeln!(
        html,
        "<button type=\"submit\" name=\"action\" value=\"{RESPOND_ACTION}\">Get response</button>"
    );
    html.push_str("</form>\n");

    match outcome {
        Some(Outcome::Reply(reply)) => {
            let _ = writeln!(
                html,
                "<section>\n<p><strong>rbot:</strong></p>\n<div class=\"reply\">{}</div>\n</section>",
                escape_html(reply)
            );
        }
        Some(Outcome::Error(error)) => {
            let _ = writeln!(html, "<p class=\"error\">Error: {}</p>", escape_html(error));
        }
        None => {}
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn push_option(html: &mut String, value: &str, label: &str, selected: bool) {
    let _ = writeln!(
        html,
        "<option value=\"{}\"{}>{}</option>",
        escape_html(value),
        if selected { " selected" } else { "" },
        escape_html(label)
    );
}

/// Escapes text for use in HTML content and attribute values.
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
