//! Output rendering for the chat front-end.
//!
//! Replies go to stdout. Errors always go to stderr. Informational banners go
//! to stdout in interactive mode and to stderr in batch mode, so that batch
//! stdout carries nothing but the reply.

use std::io::{self, Stdout, Write};

/// ANSI escape code for cyan text (used for the speaker label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for dim text (used for informational lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Capturing output in memory
pub trait Renderer: Send {
    /// Print a complete reply, optionally prefixed by the speaker's name.
    fn print_reply(&mut self, speaker: Option<&str>, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    info_to_stderr: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            info_to_stderr: false,
        }
    }

    /// Sends informational messages to stderr instead of stdout.
    pub fn with_info_to_stderr(mut self, info_to_stderr: bool) -> Self {
        self.info_to_stderr = info_to_stderr;
        self
    }

    /// Flushes stdout to ensure immediate display.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_reply(&mut self, speaker: Option<&str>, text: &str) {
        match (speaker, self.use_color) {
            (Some(speaker), true) => println!("{ANSI_CYAN}{speaker}:{ANSI_RESET} {text}"),
            (Some(speaker), false) => println!("{speaker}: {text}"),
            (None, _) => println!("{text}"),
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        if self.info_to_stderr {
            eprintln!("{info}");
        } else if self.use_color {
            println!("{ANSI_DIM}{info}{ANSI_RESET}");
            self.flush();
        } else {
            println!("{info}");
            self.flush();
        }
    }
}

/// Renderer that keeps everything it is asked to print.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingRenderer {
    /// Replies, formatted as they would be printed.
    pub replies: Vec<String>,
    /// Informational messages.
    pub info: Vec<String>,
    /// Error messages.
    pub errors: Vec<String>,
}

impl RecordingRenderer {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for RecordingRenderer {
    fn print_reply(&mut self, speaker: Option<&str>, text: &str) {
        match speaker {
            Some(speaker) => self.replies.push(format!("{speaker}: {text}")),
            None => self.replies.push(text.to_string()),
        }
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn print_info(&mut self, info: &str) {
        self.info.push(info.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
        assert!(!renderer.info_to_stderr);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false).with_info_to_stderr(true);
        assert!(!renderer.use_color);
        assert!(renderer.info_to_stderr);
    }

    #[test]
    fn recorder_formats_speaker() {
        let mut renderer = RecordingRenderer::new();
        renderer.print_reply(Some("rbot"), "hello");
        renderer.print_reply(None, "bare");
        renderer.print_info("info");
        renderer.print_error("oops");
        assert_eq!(renderer.replies, vec!["rbot: hello", "bare"]);
        assert_eq!(renderer.info, vec!["info"]);
        assert_eq!(renderer.errors, vec!["oops"]);
    }
}
