//! The lobby: turns connection events into registry operations and
//! outbound deliveries.
//!
//! This is the whole relay core with the I/O cut off. Each call handles one
//! inbound event to completion and returns the list of events to send, with
//! every room scope already resolved to concrete connections. Scopes are
//! resolved *before* a room is closed, which is what lets the teardown
//! notice reach the members of the room being removed.

use marquee_protocol::{
    ClientEvent, CreateRoom, GuestJoined, JoinRoom, JoinedSuccess, Recipient, RejoinHost,
    RoomCode, RoomRef, ServerEvent,
};
use marquee_transport::ConnectionId;

use crate::{RoomError, RoomRegistry, relay};

/// One outbound event for one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

impl Delivery {
    pub fn new(to: ConnectionId, event: ServerEvent) -> Self {
        Self { to, event }
    }
}

/// Owns the [`RoomRegistry`] and applies the room lifecycle rules.
#[derive(Debug, Default)]
pub struct Lobby {
    registry: RoomRegistry,
}

impl Lobby {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access for diagnostics and tests.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Handles one inbound event from `connection`.
    pub fn handle_event(&mut self, connection: ConnectionId, event: ClientEvent) -> Vec<Delivery> {
        match event {
            ClientEvent::CreateRoom(req) => self.create_room(connection, req),
            ClientEvent::JoinRoom(req) => self.join_room(connection, req),
            ClientEvent::RejoinHost(req) => self.rejoin_host(connection, req),
            ClientEvent::LeaveRoom(req) => self.leave_room(connection, req.room_code),
            game => self.relay(connection, game),
        }
    }

    /// Handles `connection` going away, cleanly or not.
    ///
    /// If it held a seat, the remaining member is told the room is gone and
    /// the room is closed. A connection sits in at most one room, so at most
    /// one room closes here.
    pub fn handle_disconnect(&mut self, connection: ConnectionId) -> Vec<Delivery> {
        let Some(code) = self.registry.find_room_by_connection(connection).cloned() else {
            return Vec::new();
        };

        let mut deliveries = self.teardown(&code);
        deliveries.retain(|d| d.to != connection);
        tracing::info!(room_code = %code, %connection, "room closed due to disconnect");
        deliveries
    }

    fn create_room(&mut self, connection: ConnectionId, req: CreateRoom) -> Vec<Delivery> {
        let code = req.room_code;
        let result = self
            .registry
            .create(code.clone(), req.host_name, req.rounds, connection)
            .map(|room| room.code().clone());

        match result {
            Ok(created) => self.reply(connection, ServerEvent::RoomCreated(RoomRef::new(created))),
            Err(e) => self.rejected(connection, code, e),
        }
    }

    fn join_room(&mut self, connection: ConnectionId, req: JoinRoom) -> Vec<Delivery> {
        let code = req.room_code;
        let result = self
            .registry
            .join(&code, req.guest_name.clone(), connection)
            .map(|room| (room.host().connection, room.host().name.clone()));

        match result {
            Ok((host, host_name)) => {
                let mut deliveries = self.reply(
                    host,
                    ServerEvent::GuestJoined(GuestJoined {
                        guest_name: req.guest_name,
                        room_code: code.clone(),
                    }),
                );
                deliveries.extend(self.reply(
                    connection,
                    ServerEvent::JoinedSuccess(JoinedSuccess {
                        host_name,
                        room_code: code,
                    }),
                ));
                deliveries
            }
            Err(e) => self.rejected(connection, code, e),
        }
    }

    /// Failed rejoins are silent: the client just stays unbound.
    fn rejoin_host(&mut self, connection: ConnectionId, req: RejoinHost) -> Vec<Delivery> {
        let code = req.room_code;
        match self.registry.rejoin_host(&code, req.host_name, connection) {
            Ok(_) => self.reply(connection, ServerEvent::RoomCreated(RoomRef::new(code))),
            Err(e) => {
                tracing::debug!(%connection, room_code = %code, error = %e, "rejoin ignored");
                Vec::new()
            }
        }
    }

    fn leave_room(&mut self, connection: ConnectionId, code: RoomCode) -> Vec<Delivery> {
        if !self.registry.contains(&code) {
            tracing::debug!(%connection, room_code = %code, "leave for unknown room");
            return Vec::new();
        }
        let deliveries = self.teardown(&code);
        tracing::info!(room_code = %code, %connection, "room closed by leave");
        deliveries
    }

    fn relay(&self, connection: ConnectionId, event: ClientEvent) -> Vec<Delivery> {
        let name = event.name();
        match relay::route(connection, event) {
            Ok((recipient, out)) => {
                let deliveries = self.deliver(&recipient, &out);
                if deliveries.is_empty() {
                    tracing::debug!(%connection, event = name, ?recipient, "relay had no recipients");
                }
                deliveries
            }
            Err(e) => {
                tracing::debug!(%connection, event = name, error = %e, "relay dropped");
                Vec::new()
            }
        }
    }

    /// Broadcast-then-close, shared by leave and disconnect.
    fn teardown(&mut self, code: &RoomCode) -> Vec<Delivery> {
        let (recipient, notice) = relay::room_closed(code.clone());
        let deliveries = self.deliver(&recipient, &notice);
        self.registry.close(code);
        deliveries
    }

    fn deliver(&self, recipient: &Recipient, event: &ServerEvent) -> Vec<Delivery> {
        relay::resolve(&self.registry, recipient)
            .into_iter()
            .map(|to| Delivery::new(to, event.clone()))
            .collect()
    }

    fn reply(&self, to: ConnectionId, event: ServerEvent) -> Vec<Delivery> {
        self.deliver(&Recipient::Connection(to), &event)
    }

    /// Reports a refused create/join to the requester alone.
    fn rejected(&self, connection: ConnectionId, code: RoomCode, error: RoomError) -> Vec<Delivery> {
        tracing::debug!(%connection, room_code = %code, %error, "room request rejected");
        let reply = match error {
            RoomError::NotFound(_) => ServerEvent::RoomNotFound(RoomRef::new(code)),
            RoomError::CodeTaken(_) | RoomError::RoomFull(_) | RoomError::AlreadyInRoom(..) => {
                ServerEvent::RoomFull(RoomRef::new(code))
            }
        };
        self.reply(connection, reply)
    }
}

