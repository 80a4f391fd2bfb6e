//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! `accept` only takes the TCP socket; the upgrade runs in
//! [`WebSocketUpgrade::upgrade`], normally on the connection's own task.
//!
//! Any `Origin` is accepted: the quiz client is a static bundle that may be
//! served from any host, so the upgrade never checks it. The origin is only
//! logged.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};

use crate::{
    Connection, ConnectionId, PendingConnection, Transport, TransportError,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener is bound to.
    ///
    /// Useful when binding to port 0 and letting the OS pick.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Pending = WebSocketUpgrade;
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Pending, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::trace!(%id, %addr, "accepted TCP socket");
        Ok(WebSocketUpgrade { id, addr, stream })
    }
}

/// A TCP socket waiting for its WebSocket upgrade request.
pub struct WebSocketUpgrade {
    id: ConnectionId,
    addr: SocketAddr,
    stream: TcpStream,
}

impl PendingConnection for WebSocketUpgrade {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn upgrade(self) -> Result<Self::Connection, Self::Error> {
        let Self { id, addr, stream } = self;

        let mut origin: Option<String> = None;
        let ws = tokio_tungstenite::accept_hdr_async(
            stream,
            |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                origin = req
                    .headers()
                    .get("origin")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                Ok(resp)
            },
        )
        .await
        .map_err(|e| TransportError::Handshake(e.to_string()))?;

        tracing::debug!(
            %id,
            %addr,
            origin = origin.as_deref().unwrap_or("-"),
            "accepted WebSocket connection"
        );

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            opened: Instant::now(),
            last_inbound_ms: AtomicU64::new(0),
        })
    }
}

/// A single WebSocket connection.
///
/// The socket is split so a pending `recv` never blocks a `send`.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
    opened: Instant,
    /// Milliseconds after `opened` of the last inbound message.
    last_inbound_ms: AtomicU64,
}

impl WebSocketConnection {
    fn mark_inbound(&self) {
        let ms = u64::try_from(self.opened.elapsed().as_millis())
            .unwrap_or(u64::MAX);
        self.last_inbound_ms.store(ms, Ordering::Relaxed);
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// UTF-8 payloads go out as text frames (browser clients parse them
    /// directly); anything else as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            let next = stream.next().await;
            if matches!(next, Some(Ok(_))) {
                self.mark_inbound();
            }
            match next {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(
            self.last_inbound_ms.load(Ordering::Relaxed),
        );
        self.opened.elapsed().saturating_sub(last)
    }
}
