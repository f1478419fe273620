use std::net::SocketAddr;

use crate::ConnectionId;

/// Errors raised by the socket layer underneath the relay.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be opened.
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The listener itself failed while waiting for a player to dial in.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// A socket connected but never finished the WebSocket upgrade.
    #[error("WebSocket upgrade from {0} timed out")]
    HandshakeTimeout(SocketAddr),

    /// A socket connected but sent something that is not a WebSocket upgrade.
    #[error("WebSocket upgrade from {addr} failed: {source}")]
    Handshake {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The player's socket is already gone; nothing more can be written.
    #[error("connection {0} closed")]
    ConnectionClosed(ConnectionId),

    /// Writing a frame to a live socket failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading the next frame failed, e.g. the peer reset the socket.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The server is stopping and takes no new players.
    #[error("transport shut down")]
    Shutdown,
}
