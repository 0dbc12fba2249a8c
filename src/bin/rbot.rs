//! Command-line chat with OpenAI and Anthropic models.
//!
//! # Usage
//!
//! ```bash
//! # One prompt, reply on stdout
//! rbot -p "Summarize the plot of Hamlet"
//!
//! # Prompt from a file or from stdin
//! rbot -f prompt.md
//! git diff | rbot --stdin -d decorators/reviewer.md
//!
//! # Interactive conversation with a specific engine
//! rbot -i -e anthropic -t 0.2
//!
//! # Continue a saved conversation
//! rbot -ls
//! rbot -l review.json
//! ```

use std::io::{self, IsTerminal};

use rbot::chat::{ChatArgs, ChatIo, EXIT_USAGE, PlainTextRenderer, ReadlineSource, Renderer, run};
use rbot::{AppContext, ProviderDispatcher, init_tracing};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = match ChatArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("Error: {err}");
            eprintln!("{}", ChatArgs::usage());
            std::process::exit(EXIT_USAGE);
        }
    };
    if args.help {
        println!("{}", ChatArgs::usage());
        return Ok(());
    }

    let context = AppContext::from_env()?;
    let dispatcher = ProviderDispatcher::new()?;
    let mut renderer = PlainTextRenderer::with_color(io::stdout().is_terminal())
        .with_info_to_stderr(!args.is_interactive());
    let mut lines = ReadlineSource::new();
    let mut stdin = io::stdin();

    let io = ChatIo {
        lines: &mut lines,
        stdin: &mut stdin,
        renderer: &mut renderer,
    };
    let outcome = run(&args, &context, &dispatcher, io).await;
    let status = match outcome {
        Ok(status) => status,
        Err(err) if err.is_usage() => {
            renderer.print_error(&err.to_string());
            EXIT_USAGE
        }
        Err(err) => {
            renderer.print_error(&err.to_string());
            1
        }
    };
    std::process::exit(status);
}
