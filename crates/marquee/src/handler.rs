//! Per-connection handler: reader loop, writer task and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the connection's outbound channel with the hub
//!   2. Spawn a writer task: outbound channel → encode → socket
//!   3. Loop: receive frames → decode → forward to the hub
//!   4. On exit, the guard tells the hub the connection is gone

use std::sync::Arc;

use marquee_protocol::{ClientEvent, Codec};
use marquee_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::MarqueeError;
use crate::hub::{HubHandle, OUTBOUND_QUEUE};
use crate::server::ServerState;

/// Drop guard that unregisters a connection when the handler exits.
///
/// Fires on clean close, transport error and panic alike. `Drop` is
/// synchronous, which is fine here since the hub channel is unbounded.
struct DisconnectGuard {
    connection: ConnectionId,
    hub: HubHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.hub.disconnect(self.connection);
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<K: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<K>>,
) -> Result<(), MarqueeError> {
    let conn_id = conn.id();
    let conn = Arc::new(conn);
    tracing::debug!(%conn_id, "handling new connection");

    let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE);
    state.hub.connect(conn_id, tx);
    let _guard = DisconnectGuard {
        connection: conn_id,
        hub: state.hub.clone(),
    };

    // Writer: ends when the hub drops our sender or the socket refuses a
    // frame.
    let writer_conn = Arc::clone(&conn);
    let writer_state = Arc::clone(&state);
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let bytes = match writer_state.codec.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "failed to encode event");
                    continue;
                }
            };
            if let Err(e) = writer_conn.send(&bytes).await {
                tracing::debug!(%conn_id, error = %e, "send failed, writer stopping");
                break;
            }
        }
    });

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed");
                break;
            }
            Err(e) => {
                tracing::info!(%conn_id, error = %e, "connection closed with error");
                return Err(e.into());
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode event");
                continue;
            }
        };

        state.hub.event(conn_id, event);
    }

    // _guard drops here → hub unregisters the connection.
    Ok(())
}
