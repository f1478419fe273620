//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// How long a freshly accepted socket gets to complete the upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
///
/// Upgrades run in their own tasks, so a socket that connects and then
/// goes quiet never holds up the sockets behind it.
pub struct WebSocketTransport {
    listener: TcpListener,
    handshakes: JoinSet<Result<WebSocketConnection, TransportError>>,
    handshake_timeout: Duration,
    closed: AtomicBool,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            handshakes: JoinSet::new(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            closed: AtomicBool::new(false),
        })
    }

    /// Sets how long a socket may take to finish the WebSocket upgrade
    /// before it is dropped.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Returns the address the listener is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    /// Returns the next connection whose upgrade has completed, in
    /// completion order. Failed or timed-out upgrades are logged and
    /// skipped.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(TransportError::Shutdown);
            }

            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, addr) = accepted.map_err(TransportError::AcceptFailed)?;
                    self.handshakes.spawn(upgrade(stream, addr, self.handshake_timeout));
                }
                Some(joined) = self.handshakes.join_next() => match joined {
                    Ok(Ok(conn)) => return Ok(conn),
                    Ok(Err(e)) => tracing::debug!(error = %e, "dropping socket"),
                    Err(e) => tracing::warn!(error = %e, "upgrade task failed"),
                },
            }
        }
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.closed.store(true, Ordering::Release);
        tracing::info!("WebSocket transport shut down");
        Ok(())
    }
}

/// Runs the WebSocket upgrade for one accepted socket.
async fn upgrade(
    stream: TcpStream,
    addr: SocketAddr,
    timeout: Duration,
) -> Result<WebSocketConnection, TransportError> {
    let ws = tokio::time::timeout(timeout, tokio_tungstenite::accept_async(stream))
        .await
        .map_err(|_| TransportError::HandshakeTimeout(addr))?
        .map_err(|e| TransportError::Handshake {
            addr,
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

    let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    tracing::debug!(%id, %addr, "accepted WebSocket connection");

    let (sink, stream) = ws.split();
    Ok(WebSocketConnection {
        id,
        sink: Mutex::new(sink),
        stream: Mutex::new(stream),
    })
}

/// A single WebSocket connection.
///
/// The socket is split so a task parked in [`recv`](Connection::recv)
/// does not hold up outbound traffic.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    fn map_send_error(&self, e: tungstenite::Error) -> TransportError {
        match e {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::ConnectionClosed(self.id)
            }
            other => TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                other,
            )),
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Sends UTF-8 payloads as text frames (what browser clients expect for
    /// JSON) and anything else as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| self.map_send_error(e))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| self.map_send_error(e))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
