//! Wire types for the relay: every event that travels between a client and
//! the server.
//!
//! Each frame is a named event plus a payload:
//!
//! ```json
//! { "event": "joinRoom", "data": { "roomCode": "ABCD", "guestName": "Bob" } }
//! ```
//!
//! `#[serde(tag = "event", content = "data")]` produces exactly this
//! "adjacently tagged" shape, and `rename_all = "camelCase"` turns
//! `ClientEvent::JoinRoom` into `"joinRoom"`. Payload structs carry their own
//! `rename_all` so `room_code` is spelled `roomCode` on the wire.
//!
//! Game fields (letters, movies, round results, the `rounds` setting) are
//! kept as raw `serde_json::Value`s. The relay moves them, it never reads
//! them.

use std::fmt;

use marquee_transport::ConnectionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A client-chosen room code.
///
/// Opaque: no case folding, trimming, or length checks. `"abcd"` and
/// `"ABCD"` are different rooms. Serialized as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a raw code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive an outbound event?
// ---------------------------------------------------------------------------

/// The scope an outbound event is addressed to.
///
/// Room scopes are resolved to concrete connections against the room
/// registry at dispatch time, so a room that has already been closed
/// resolves to nobody.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// One specific connection (the requester, or a room's host).
    Connection(ConnectionId),

    /// Every member of the room, the sender included.
    Room(RoomCode),

    /// Every member of the room except the given connection.
    RoomExcept(RoomCode, ConnectionId),
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A payload that only names a room.
///
/// Used by `leaveRoom`, `roomCreated`, `roomFull`, `roomNotFound`, and
/// `playerDisconnected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub room_code: RoomCode,
}

impl RoomRef {
    pub fn new(code: impl Into<RoomCode>) -> Self {
        Self {
            room_code: code.into(),
        }
    }
}

/// `createRoom`: the host opens a room under a code of their choosing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    pub room_code: RoomCode,
    pub host_name: String,
    /// Game configuration, stored with the room and never interpreted.
    #[serde(default)]
    pub rounds: Value,
}

/// `joinRoom`: a guest asks to take the room's second seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_code: RoomCode,
    pub guest_name: String,
}

/// `rejoinHost`: a reconnecting host reclaims an existing room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejoinHost {
    pub room_code: RoomCode,
    pub host_name: String,
}

/// `letterGuess`: one player guessed a letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterGuess {
    pub room_code: RoomCode,
    pub letter: Value,
    /// The client's own verdict. Accepted for compatibility, never used
    /// for routing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    pub sender: Value,
}

/// `letterAttempt`: what the other player sees for a [`LetterGuess`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterAttempt {
    pub letter: Value,
    pub guesser: Value,
}

impl From<LetterGuess> for LetterAttempt {
    fn from(guess: LetterGuess) -> Self {
        Self {
            letter: guess.letter,
            guesser: guess.sender,
        }
    }
}

/// `movieSet`: the setter picked the title to be guessed. Relayed as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSet {
    pub room_code: RoomCode,
    pub movie: Value,
    pub setter_name: Value,
}

/// `joinedSuccess`: tells the guest who is hosting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedSuccess {
    pub host_name: String,
    pub room_code: RoomCode,
}

/// `guestJoined`: tells the host who took the second seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestJoined {
    pub guest_name: String,
    pub room_code: RoomCode,
}

/// A JSON object the relay forwards without looking inside, apart from
/// reading its `roomCode` to pick recipients.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaquePayload(pub Map<String, Value>);

impl OpaquePayload {
    /// Reads the routing key.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] when `roomCode` is missing
    /// or not a string.
    pub fn room_code(&self) -> Result<RoomCode, ProtocolError> {
        self.0
            .get("roomCode")
            .and_then(Value::as_str)
            .map(RoomCode::from)
            .ok_or_else(|| ProtocolError::InvalidMessage("payload has no string roomCode".into()))
    }
}

impl From<Map<String, Value>> for OpaquePayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Client → Server events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    // -- Room lifecycle --
    CreateRoom(CreateRoom),
    JoinRoom(JoinRoom),
    RejoinHost(RejoinHost),
    LeaveRoom(RoomRef),

    // -- Game relay --
    LetterGuess(LetterGuess),
    MovieSet(MovieSet),
    RoundResult(OpaquePayload),
    StartRound(OpaquePayload),
}

impl ClientEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => "createRoom",
            Self::JoinRoom(_) => "joinRoom",
            Self::RejoinHost(_) => "rejoinHost",
            Self::LeaveRoom(_) => "leaveRoom",
            Self::LetterGuess(_) => "letterGuess",
            Self::MovieSet(_) => "movieSet",
            Self::RoundResult(_) => "roundResult",
            Self::StartRound(_) => "startRound",
        }
    }
}

/// Server → Client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    // -- Lifecycle outcomes --
    /// Creation or rejoin acknowledged.
    RoomCreated(RoomRef),
    /// Code already taken, or the guest seat is occupied.
    RoomFull(RoomRef),
    /// No room under that code.
    RoomNotFound(RoomRef),
    JoinedSuccess(JoinedSuccess),
    GuestJoined(GuestJoined),
    /// The room was torn down, by `leaveRoom` or by a member disconnecting.
    PlayerDisconnected(RoomRef),

    // -- Game relay --
    LetterAttempt(LetterAttempt),
    MovieSet(MovieSet),
    RoundResult(OpaquePayload),
    StartRound(OpaquePayload),
}
