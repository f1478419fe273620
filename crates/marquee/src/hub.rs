//! The hub: a single task that owns the [`Lobby`] and every connection's
//! outbound channel.
//!
//! Connection handlers never touch room state. They push commands into the
//! hub's channel and the hub applies them one at a time, each to
//! completion, before fanning out the resulting events. That keeps registry
//! mutations serialized under tokio's multi-threaded scheduler without a
//! lock, and guarantees a relayed event is only visible once the event that
//! caused it has been fully processed.

use std::collections::HashMap;

use marquee_protocol::{ClientEvent, ServerEvent};
use marquee_room::{Delivery, Lobby};
use marquee_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Outbound events a connection may have queued before new ones are
/// dropped. A client that stops reading loses events instead of growing
/// the server's memory.
pub(crate) const OUTBOUND_QUEUE: usize = 64;

/// Channel the hub uses to hand events to a connection's writer task.
pub(crate) type EventSender = mpsc::Sender<ServerEvent>;

/// Commands sent to the hub. Each connection sends `Connect`, then any
/// number of `Event`s, then exactly one `Disconnect`, all on the same
/// channel so their order is kept.
pub(crate) enum HubCommand {
    Connect {
        connection: ConnectionId,
        sender: EventSender,
    },
    Event {
        connection: ConnectionId,
        event: ClientEvent,
    },
    Disconnect {
        connection: ConnectionId,
    },
}

/// Handle for talking to the hub task. Cheap to clone.
///
/// The channel is unbounded so commands can be sent from synchronous
/// contexts such as `Drop`.
#[derive(Clone)]
pub(crate) struct HubHandle {
    sender: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    pub(crate) fn connect(&self, connection: ConnectionId, sender: EventSender) {
        self.send(HubCommand::Connect { connection, sender });
    }

    pub(crate) fn event(&self, connection: ConnectionId, event: ClientEvent) {
        self.send(HubCommand::Event { connection, event });
    }

    pub(crate) fn disconnect(&self, connection: ConnectionId) {
        self.send(HubCommand::Disconnect { connection });
    }

    fn send(&self, cmd: HubCommand) {
        if self.sender.send(cmd).is_err() {
            tracing::warn!("hub is gone, command dropped");
        }
    }
}

/// Connection lifecycle, per connection: present in `connections` while
/// `Connected`, removed on `Disconnected`. There is no way back.
struct Hub {
    lobby: Lobby,
    connections: HashMap<ConnectionId, EventSender>,
    receiver: mpsc::UnboundedReceiver<HubCommand>,
}

impl Hub {
    async fn run(mut self) {
        tracing::debug!("hub started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                HubCommand::Connect { connection, sender } => {
                    self.connections.insert(connection, sender);
                    tracing::debug!(%connection, live = self.connections.len(), "connection registered");
                }
                HubCommand::Event { connection, event } => {
                    if !self.connections.contains_key(&connection) {
                        tracing::debug!(%connection, event = event.name(), "event from closed connection ignored");
                        continue;
                    }
                    let deliveries = self.lobby.handle_event(connection, event);
                    self.dispatch(deliveries);
                }
                HubCommand::Disconnect { connection } => {
                    // Drop the sender first so nothing is queued for a
                    // connection that is already gone.
                    if self.connections.remove(&connection).is_none() {
                        continue;
                    }
                    let deliveries = self.lobby.handle_disconnect(connection);
                    self.dispatch(deliveries);
                    tracing::debug!(
                        %connection,
                        live = self.connections.len(),
                        rooms = self.lobby.registry().len(),
                        "connection unregistered"
                    );
                }
            }
        }

        tracing::debug!("hub stopped");
    }

    /// Queues each delivery on its connection's writer channel without
    /// waiting. Deliveries to connections that are gone, or whose queue is
    /// full, are dropped.
    fn dispatch(&self, deliveries: Vec<Delivery>) {
        for Delivery { to, event } in deliveries {
            let Some(sender) = self.connections.get(&to) else {
                tracing::debug!(connection = %to, "no such connection, delivery dropped");
                continue;
            };
            match sender.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(connection = %to, "outbound queue full, delivery dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection = %to, "writer gone, delivery dropped");
                }
            }
        }
    }
}

/// Spawns the hub task and returns a handle to it.
pub(crate) fn spawn_hub() -> HubHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let hub = Hub {
        lobby: Lobby::new(),
        connections: HashMap::new(),
        receiver: rx,
    };
    tokio::spawn(hub.run());
    HubHandle { sender: tx }
}
