//! Browser chat with OpenAI and Anthropic models.
//!
//! ```bash
//! rbot-web --port 8501
//! ```
//!
//! Then open `http://127.0.0.1:8501/`.

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use tokio::net::TcpListener;

use rbot::chat::EXIT_USAGE;
use rbot::web::{DEFAULT_HOST, DEFAULT_PORT, WebServer, reject_free_args};
use rbot::{AppContext, ProviderDispatcher, init_tracing};

/// Command-line arguments for rbot-web.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct WebArgs {
    /// Address to bind.
    #[arrrg(optional, "Host to bind (default: 127.0.0.1)", "HOST")]
    host: Option<String>,

    /// Port to bind.
    #[arrrg(optional, "Port to bind (default: 8501)", "PORT")]
    port: Option<u16>,
}

const USAGE: &str = "rbot-web [OPTIONS]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let (args, free) = WebArgs::from_command_line_relaxed(USAGE);
    if let Err(err) = reject_free_args(&free) {
        eprintln!("Error: {err}");
        eprintln!("Usage: {USAGE}");
        std::process::exit(EXIT_USAGE);
    }

    let context = AppContext::from_env()?;
    let dispatcher = ProviderDispatcher::new()?;
    let host = args.host.as_deref().unwrap_or(DEFAULT_HOST);
    let port = args.port.unwrap_or(DEFAULT_PORT);

    let listener = TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    println!("rbot-web listening on http://{addr}/");
    tracing::info!(%addr, "serving");

    WebServer::new(context, dispatcher).serve(listener).await?;
    Ok(())
}
