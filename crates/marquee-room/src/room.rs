//! The room record: a code, a host seat, an optional guest seat, and the
//! game settings the host opened it with.

use std::fmt;

use marquee_protocol::RoomCode;
use marquee_transport::ConnectionId;
use serde_json::Value;

/// Which seat a connection holds in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Guest => write!(f, "guest"),
        }
    }
}

/// A participant bound to a seat: the connection it arrived on and the
/// display name it gave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub connection: ConnectionId,
    pub name: String,
}

/// A paired game session keyed by a client-chosen code.
///
/// Only [`RoomRegistry`](crate::RoomRegistry) creates or mutates rooms;
/// everyone else gets a shared reference for the length of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    code: RoomCode,
    host: Seat,
    guest: Option<Seat>,
    rounds: Value,
}

impl Room {
    pub(crate) fn new(code: RoomCode, host: Seat, rounds: Value) -> Self {
        Self {
            code,
            host,
            guest: None,
            rounds,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn host(&self) -> &Seat {
        &self.host
    }

    /// The guest seat, once someone has joined. Stays filled after the
    /// guest disconnects; the room is closed in that case anyway.
    pub fn guest(&self) -> Option<&Seat> {
        self.guest.as_ref()
    }

    /// The game settings passed at creation, untouched.
    pub fn rounds(&self) -> &Value {
        &self.rounds
    }

    /// Connections currently seated, host first.
    pub fn members(&self) -> Vec<ConnectionId> {
        let mut members = Vec::with_capacity(2);
        members.push(self.host.connection);
        if let Some(guest) = &self.guest {
            members.push(guest.connection);
        }
        members
    }

    /// The seat `connection` holds here, if any.
    pub fn role_of(&self, connection: ConnectionId) -> Option<Role> {
        if self.host.connection == connection {
            Some(Role::Host)
        } else if self.guest.as_ref().is_some_and(|g| g.connection == connection) {
            Some(Role::Guest)
        } else {
            None
        }
    }

    pub(crate) fn set_host(&mut self, host: Seat) {
        self.host = host;
    }

    pub(crate) fn set_guest(&mut self, guest: Seat) {
        self.guest = Some(guest);
    }
}
