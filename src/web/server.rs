//! A minimal sequential HTTP server for the form.
//!
//! Only `GET /` and `POST /` are routed. Connections are handled one at a
//! time and closed after each response.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Take};
use tokio::net::{TcpListener, TcpStream};

use crate::client::{ChatRequest, Dispatcher, PreambleState};
use crate::context::AppContext;
use crate::decorators::DecoratorSet;
use crate::error::{Error, Result};
use crate::history::History;
use crate::observability::WEB_REQUESTS;
use crate::types::Message;
use crate::web::form::{FormInput, FormState};
use crate::web::page::{Outcome, escape_html, render_page};

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8501;

const MAX_HEAD_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// How long a client may take to send its request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fails with a usage error when `rbot-web` was given positional arguments.
pub fn reject_free_args(free: &[String]) -> Result<()> {
    match free.first() {
        Some(arg) => Err(Error::usage(format!("unexpected argument: {arg}"))),
        None => Ok(()),
    }
}

/// A parsed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method, such as `GET`.
    pub method: String,
    /// Path without the query string.
    pub path: String,
    /// Query string, without the `?`.
    pub query: Option<String>,
    /// Request body.
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Builds a request from a method and a target such as `/?a=b`.
    pub fn new(method: &str, target: &str, body: Vec<u8>) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target.to_string(), None),
        };
        Self {
            method: method.to_ascii_uppercase(),
            path,
            query,
            body,
        }
    }
}

/// An HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status line after the protocol, such as `200 OK`.
    pub status: &'static str,
    /// Content type.
    pub content_type: &'static str,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    fn html(body: String) -> Self {
        Self {
            status: "200 OK",
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    fn error(status: &'static str, detail: &str) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body: format!(
                "<!DOCTYPE html>\n<html><body><h1>{}</h1><p>{}</p></body></html>\n",
                escape_html(status),
                escape_html(detail)
            ),
        }
    }

    /// Serializes the response, closing the connection afterwards.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

/// The form server.
pub struct WebServer<D: Dispatcher> {
    context: AppContext,
    dispatcher: D,
    request_timeout: Duration,
}

impl<D: Dispatcher> WebServer<D> {
    /// Create a server over a context and dispatcher.
    pub fn new(context: AppContext, dispatcher: D) -> Self {
        Self {
            context,
            dispatcher,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets how long a connection may take to deliver its request before it
    /// is answered with `408` and closed.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Accepts connections forever, serving each to completion before the
    /// next. A connection that does not deliver its request within the
    /// request timeout is answered with `408`. Failures on one connection are
    /// logged and do not stop the server.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            if let Err(err) = self.serve_connection(stream, peer).await {
                tracing::warn!(%peer, error = %err, "connection failed");
            }
        }
    }

    async fn serve_connection(&self, stream: TcpStream, peer: SocketAddr) -> Result<()> {
        let mut reader = BufReader::new(stream);
        let read = tokio::time::timeout(self.request_timeout, read_request(&mut reader)).await;
        let response = match read {
            Err(_) => {
                tracing::debug!(%peer, "request timed out");
                HttpResponse::error("408 Request Timeout", "No request arrived in time.")
            }
            Ok(Ok(request)) => {
                tracing::debug!(%peer, method = %request.method, path = %request.path, "request");
                self.handle(&request).await
            }
            Ok(Err(err)) if err.is_bad_request() => {
                HttpResponse::error("400 Bad Request", &err.to_string())
            }
            Ok(Err(err)) => return Err(err),
        };
        let mut stream = reader.into_inner();
        stream.write_all(&response.to_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Routes one request.
    pub async fn handle(&self, request: &HttpRequest) -> HttpResponse {
        WEB_REQUESTS.click();
        if request.path != "/" {
            return HttpResponse::error("404 Not Found", "Only / is served.");
        }
        let input = match request.method.as_str() {
            "GET" => FormInput::from_urlencoded(request.query.as_deref().unwrap_or("").as_bytes()),
            "POST" => FormInput::from_urlencoded(&request.body),
            _ => return HttpResponse::error("404 Not Found", "Only GET and POST are served."),
        };
        let state = FormState::resolve(
            self.context.catalog(),
            self.context.default_decorators(),
            &input,
        );
        let outcome = if input.wants_reply() {
            Some(self.respond(&state).await)
        } else {
            None
        };
        HttpResponse::html(render_page(
            self.context.catalog(),
            &state,
            outcome.as_ref(),
            OffsetDateTime::now_utc(),
        ))
    }

    /// Performs one dispatcher call with a fresh decorator-only history.
    async fn respond(&self, state: &FormState) -> Outcome {
        if state.prompt.trim().is_empty() {
            return Outcome::Error("Enter a prompt first.".to_string());
        }
        let decorators = match DecoratorSet::load(&state.decorator_paths()) {
            Ok(decorators) => decorators,
            Err(err) => return Outcome::Error(err.to_string()),
        };
        let mut history = History::from_decorators(&decorators);
        history.push(Message::user(state.prompt.as_str()));
        let request = ChatRequest {
            prompt: &state.prompt,
            decorators: decorators.texts(),
            history: history.messages(),
            engine: &state.engine,
            model: &state.model,
            temperature: state.temperature,
            max_tokens: state.max_tokens,
        };
        let mut preamble = PreambleState::new();
        match self.dispatcher.chat(request, &mut preamble).await {
            Ok(reply) => Outcome::Reply(reply),
            Err(err) => {
                tracing::warn!(error = %err, "web request failed");
                Outcome::Error(err.to_string())
            }
        }
    }
}

/// Reads one request: the request line, headers, and a `Content-Length`
/// body.
///
/// # Errors
///
/// Malformed or oversized requests produce a bad-request error; socket
/// failures produce an I/O error.
pub async fn read_request<R>(reader: &mut R) -> Result<HttpRequest>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = (&mut *reader).take(MAX_HEAD_BYTES as u64);
    let request_line = read_head_line(&mut head).await?;
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(Error::bad_request("malformed request line", None));
    };
    let (method, target) = (method.to_string(), target.to_string());

    let mut content_length = 0usize;
    loop {
        let line = read_head_line(&mut head).await?;
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().map_err(|_| {
                Error::bad_request(
                    "invalid Content-Length",
                    Some("content-length".to_string()),
                )
            })?;
        }
    }
    if content_length > MAX_BODY_BYTES {
        return Err(Error::bad_request("request body too large", None));
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;
    Ok(HttpRequest::new(&method, &target, body))
}

/// Reads one CRLF- or LF-terminated head line without its terminator.
/// End of input yields an empty line.
async fn read_head_line<R>(head: &mut Take<R>) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = head.read_line(&mut line).await.map_err(|err| {
        if err.kind() == io::ErrorKind::InvalidData {
            Error::bad_request("request head is not valid UTF-8", None)
        } else {
            Error::from(err)
        }
    })?;
    if read > 0 && !line.ends_with('\n') && head.limit() == 0 {
        return Err(Error::bad_request("request headers too large", None));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::catalog::tests::sample;
    use crate::chat::session::tests::ScriptedDispatcher;

    fn server(dispatcher: ScriptedDispatcher) -> WebServer<ScriptedDispatcher> {
        WebServer::new(AppContext::new(sample(), "/tmp/unused"), dispatcher)
    }

    #[tokio::test]
    async fn parses_post_requests() {
        let raw = b"POST /?x=1 HTTP/1.1\r\nHost: localhost\r\ncontent-length: 11\r\n\r\nprompt=hiXX";
        let mut reader = tokio::io::BufReader::new(Cursor::new(raw.to_vec()));
        let request = read_request(&mut reader).await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/");
        assert_eq!(request.query.as_deref(), Some("x=1"));
        assert_eq!(request.body, b"prompt=hiXX");
    }

    #[tokio::test]
    async fn rejects_malformed_requests() {
        let mut reader = tokio::io::BufReader::new(Cursor::new(b"\r\n".to_vec()));
        assert!(read_request(&mut reader).await.unwrap_err().is_bad_request());

        let raw = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n", MAX_BODY_BYTES + 1);
        let mut reader = tokio::io::BufReader::new(Cursor::new(raw.into_bytes()));
        assert!(read_request(&mut reader).await.unwrap_err().is_bad_request());
    }

    #[test]
    fn positional_arguments_are_refused() {
        assert!(reject_free_args(&[]).is_ok());
        let err = reject_free_args(&["8502".to_string(), "extra".to_string()]).unwrap_err();
        assert!(err.is_usage());
        assert_eq!(err.to_string(), "unexpected argument: 8502");
    }

    #[tokio::test]
    async fn invalid_utf8_head_is_a_bad_request() {
        let raw = b"GET /\xff\xfe HTTP/1.1\r\n\r\n".to_vec();
        let mut reader = tokio::io::BufReader::new(Cursor::new(raw));
        assert!(read_request(&mut reader).await.unwrap_err().is_bad_request());
    }

    #[tokio::test]
    async fn unterminated_request_line_is_capped() {
        let raw = format!("GET /{} HTTP/1.1", "a".repeat(MAX_HEAD_BYTES * 2));
        let mut reader = tokio::io::BufReader::new(Cursor::new(raw.into_bytes()));
        let err = read_request(&mut reader).await.unwrap_err();
        assert!(err.is_bad_request());
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn idle_connection_does_not_stall_later_clients() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = server(ScriptedDispatcher::replying(&[]))
            .with_request_timeout(Duration::from_millis(100));
        let serving = async move {
            let _ = server.serve(listener).await;
        };
        let clients = async {
            let mut idle = TcpStream::connect(addr).await.unwrap();
            let mut active = TcpStream::connect(addr).await.unwrap();
            active
                .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            active.read_to_string(&mut response).await.unwrap();
            let mut timed_out = String::new();
            idle.read_to_string(&mut timed_out).await.unwrap();
            (response, timed_out)
        };
        let (response, timed_out) = tokio::select! {
            _ = serving => unreachable!("server stopped"),
            result = tokio::time::timeout(Duration::from_secs(5), clients) => result.unwrap(),
        };
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(timed_out.starts_with("HTTP/1.1 408 Request Timeout\r\n"));
    }

    #[tokio::test]
    async fn get_renders_the_form_without_dispatch() {
        let dispatcher = ScriptedDispatcher::replying(&[]);
        let server = server(dispatcher);
        let response = server.handle(&HttpRequest::new("GET", "/", Vec::new())).await;
        assert_eq!(response.status, "200 OK");
        assert!(response.body.contains("Get response"));
        assert!(server.dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let server = server(ScriptedDispatcher::replying(&[]));
        for (method, target) in [("GET", "/favicon.ico"), ("DELETE", "/"), ("PUT", "/")] {
            let response = server
                .handle(&HttpRequest::new(method, target, Vec::new()))
                .await;
            assert_eq!(response.status, "404 Not Found");
        }
        let bytes = String::from_utf8(
            HttpResponse::error("404 Not Found", "x").to_bytes(),
        )
        .unwrap();
        assert!(bytes.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(bytes.contains("Connection: close\r\n"));
    }

    #[tokio::test]
    async fn submit_dispatches_with_decorators() {
        let dir = tempfile::tempdir().unwrap();
        let decorator = dir.path().join("d.md");
        std::fs::write(&decorator, "be kind").unwrap();
        let server = server(ScriptedDispatcher::replying(&["a <reply>"]));
        let body = format!(
            "engine=anthropic&temperature_option=balanced&prompt=hello&action=respond&decorators={}",
            url::form_urlencoded::byte_serialize(decorator.display().to_string().as_bytes())
                .collect::<String>()
        );
        let response = server
            .handle(&HttpRequest::new("POST", "/", body.into_bytes()))
            .await;
        assert!(response.body.contains("a &lt;reply&gt;"));

        let calls = server.dispatcher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].history,
            vec![Message::system("be kind"), Message::user("hello")]
        );
        assert_eq!(calls[0].model, "claude-sonnet-4-0");
        assert_eq!(calls[0].temperature, 0.40);
        assert_eq!(calls[0].max_tokens, 512);
        assert!(calls[0].needed_preamble);
    }

    #[tokio::test]
    async fn submit_problems_are_shown_not_dispatched() {
        let server = server(ScriptedDispatcher::replying(&[]));
        let response = server
            .handle(&HttpRequest::new(
                "POST",
                "/",
                b"prompt=&action=respond".to_vec(),
            ))
            .await;
        assert!(response.body.contains("Enter a prompt first."));

        let response = server
            .handle(&HttpRequest::new(
                "POST",
                "/",
                b"prompt=hi&action=respond&decorators=%2Fno%2Fsuch%2Fpath".to_vec(),
            ))
            .await;
        assert!(response.body.contains("class=\"error\""));
        assert!(server.dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn dispatcher_errors_are_rendered() {
        let server = server(ScriptedDispatcher::new(vec![Err(Error::authentication(
            "API key not provided",
        ))]));
        let response = server
            .handle(&HttpRequest::new(
                "POST",
                "/",
                b"prompt=hi&action=respond&decorators=".to_vec(),
            ))
            .await;
        assert_eq!(response.status, "200 OK");
        assert!(response.body.contains("API key not provided"));
    }

    #[tokio::test]
    async fn serves_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = server(ScriptedDispatcher::replying(&[]));
        let serving = async move {
            let _ = server.serve(listener).await;
        };
        let client = async {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        };
        let response = tokio::select! {
            _ = serving => unreachable!("server stopped"),
            response = client => response,
        };
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("<form method=\"post\" action=\"/\">"));
    }
}
