//! Error types for the room layer.

use marquee_protocol::RoomCode;
use marquee_transport::ConnectionId;

/// Rejected room lifecycle requests.
///
/// All of these are expected outcomes, not faults. The lobby turns each
/// one into an event for the requesting connection (or into silence), and
/// none of them ends the connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// A room with this code already exists.
    #[error("room code {0} is already taken")]
    CodeTaken(RoomCode),

    /// The guest seat has been claimed, whether or not that guest is still
    /// connected.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// No room exists under this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The connection already holds a seat in a room.
    #[error("{0} is already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomCode),
}
