//! Session transport.
//!
//! The engine only sees a text sink and a text stream ([`SessionTransport`]).
//! [`WsConnector`] produces one from a real WebSocket, optionally tunnelled
//! through an HTTP proxy with `CONNECT`; [`memory_pair`] produces one backed
//! by channels for a scripted peer.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::channel::mpsc;
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use reqwest::Url;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use super::SessionError;
use crate::types::Account;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on a proxy's `CONNECT` response head.
const MAX_PROXY_RESPONSE: usize = 8 * 1024;

pub type Outbound = Pin<Box<dyn Sink<String, Error = SessionError> + Send>>;
pub type Inbound = Pin<Box<dyn Stream<Item = Result<String, SessionError>> + Send>>;

/// Duplex text channel for one session.
pub struct SessionTransport {
    pub outbound: Outbound,
    pub inbound: Inbound,
}

impl SessionTransport {
    pub fn new<W, R>(outbound: W, inbound: R) -> Self
    where
        W: Sink<String, Error = SessionError> + Send + 'static,
        R: Stream<Item = Result<String, SessionError>> + Send + 'static,
    {
        Self {
            outbound: Box::pin(outbound),
            inbound: Box::pin(inbound),
        }
    }
}

/// Opens session transports.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self) -> Result<SessionTransport, SessionError>;
}

// ---------------------------------------------------------------------------
// WebSocket connector
// ---------------------------------------------------------------------------

pub struct WsConnector {
    url: String,
    proxy: Option<String>,
}

impl WsConnector {
    /// Connector for `{ws_base}?token={token}`, optionally through `proxy`.
    pub fn new(ws_base: &str, account: &Account, proxy: Option<&str>) -> Self {
        Self {
            url: format!("{ws_base}?token={}", urlencoding::encode(account.token())),
            proxy: proxy.map(str::to_string),
        }
    }

    async fn open(&self) -> Result<SessionTransport, SessionError> {
        let target = Url::parse(&self.url).map_err(|e| SessionError::InvalidUrl(e.to_string()))?;
        let host = target
            .host_str()
            .ok_or_else(|| SessionError::InvalidUrl("missing host".into()))?;
        let port = target
            .port_or_known_default()
            .ok_or_else(|| SessionError::InvalidUrl("missing port".into()))?;

        let stream = match &self.proxy {
            Some(proxy) => tunnel(proxy, host, port).await?,
            None => TcpStream::connect((host, port)).await?,
        };

        let (ws, response) = tokio_tungstenite::client_async_tls(self.url.as_str(), stream).await?;
        debug!(status = %response.status(), via_proxy = self.proxy.is_some(), "Session socket open");

        let (sink, stream) = ws.split();
        let outbound = sink
            .sink_map_err(SessionError::WebSocket)
            .with(|text: String| future::ready(Ok::<_, SessionError>(Message::Text(text))));
        let inbound = stream.filter_map(|msg| future::ready(text_frame(msg)));

        Ok(SessionTransport::new(outbound, inbound))
    }
}

#[async_trait]
impl SessionConnector for WsConnector {
    async fn connect(&self) -> Result<SessionTransport, SessionError> {
        tokio::time::timeout(CONNECT_TIMEOUT, self.open())
            .await
            .map_err(|_| SessionError::Timeout(CONNECT_TIMEOUT))?
    }
}

/// Keep text payloads, drop control frames.
fn text_frame(
    msg: Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<Result<String, SessionError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(text)),
        Ok(Message::Binary(bytes)) => String::from_utf8(bytes).ok().map(Ok),
        Ok(_) => None,
        Err(e) => Some(Err(e.into())),
    }
}

// ---------------------------------------------------------------------------
// HTTP CONNECT tunnelling
// ---------------------------------------------------------------------------

/// Open a TCP stream to `host:port` through an `http://` proxy.
pub async fn tunnel(proxy: &str, host: &str, port: u16) -> Result<TcpStream, SessionError> {
    let proxy_url =
        Url::parse(proxy).map_err(|e| SessionError::Proxy(format!("invalid proxy url: {e}")))?;
    if proxy_url.scheme() != "http" {
        return Err(SessionError::Proxy(format!(
            "unsupported proxy scheme '{}'",
            proxy_url.scheme()
        )));
    }
    let proxy_host = proxy_url
        .host_str()
        .ok_or_else(|| SessionError::Proxy("proxy url has no host".into()))?;
    let proxy_port = proxy_url.port_or_known_default().unwrap_or(80);

    let mut stream = TcpStream::connect((proxy_host, proxy_port)).await?;
    let request = connect_request(host, port, proxy_authorization(&proxy_url).as_deref());
    stream.write_all(request.as_bytes()).await?;

    let head = read_response_head(&mut stream).await?;
    check_connect_status(&head)?;
    Ok(stream)
}

fn connect_request(host: &str, port: u16, authorization: Option<&str>) -> String {
    let mut request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n");
    if let Some(auth) = authorization {
        request.push_str(&format!("Proxy-Authorization: Basic {auth}\r\n"));
    }
    request.push_str("\r\n");
    request
}

/// Base64 `user:pass` from the proxy URL, if it carries credentials.
fn proxy_authorization(proxy: &Url) -> Option<String> {
    if proxy.username().is_empty() {
        return None;
    }
    let user = urlencoding::decode(proxy.username()).ok()?;
    let pass = urlencoding::decode(proxy.password().unwrap_or("")).ok()?;
    Some(BASE64.encode(format!("{user}:{pass}")))
}

/// Read up to and including the blank line ending the response head, and
/// nothing past it.
async fn read_response_head<S>(stream: &mut S) -> Result<String, SessionError>
where
    S: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_PROXY_RESPONSE {
            return Err(SessionError::Proxy("CONNECT response too large".into()));
        }
        let n = stream.read(&mut byte).await?;
        if n == 0 {
            return Err(SessionError::Proxy("proxy closed during CONNECT".into()));
        }
        head.push(byte[0]);
    }
    Ok(String::from_utf8_lossy(&head).into_owned())
}

fn check_connect_status(head: &str) -> Result<(), SessionError> {
    let status_line = head.lines().next().unwrap_or_default();
    match status_line.split_whitespace().nth(1) {
        Some("200") => Ok(()),
        _ => Err(SessionError::Proxy(format!("CONNECT refused: {status_line}"))),
    }
}

// ---------------------------------------------------------------------------
// In-memory transport
// ---------------------------------------------------------------------------

/// The far end of a [`memory_pair`] transport.
pub struct MemoryPeer {
    /// Everything the session sent.
    pub sent: mpsc::UnboundedReceiver<String>,
    /// Feed messages (or errors) to the session.
    pub incoming: mpsc::UnboundedSender<Result<String, SessionError>>,
}

impl MemoryPeer {
    pub fn push(&self, text: impl Into<String>) {
        // A dropped session simply never reads it.
        let _ = self.incoming.unbounded_send(Ok(text.into()));
    }
}

/// Channel-backed transport with a scripted peer.
pub fn memory_pair() -> (SessionTransport, MemoryPeer) {
    let (out_tx, out_rx) = mpsc::unbounded::<String>();
    let (in_tx, in_rx) = mpsc::unbounded::<Result<String, SessionError>>();
    let outbound = out_tx.sink_map_err(|e| SessionError::Closed(e.to_string()));
    (
        SessionTransport::new(outbound, in_rx),
        MemoryPeer {
            sent: out_rx,
            incoming: in_tx,
        },
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
