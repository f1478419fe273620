//! Event relay: decides who receives a game event and forwards it without
//! looking at the game content.
//!
//! | Inbound       | Outbound             | Scope                |
//! |---------------|----------------------|----------------------|
//! | `letterGuess` | `letterAttempt`      | room minus sender    |
//! | `movieSet`    | `movieSet`           | room minus sender    |
//! | `roundResult` | `roundResult`        | room minus sender    |
//! | `startRound`  | `startRound`         | whole room           |
//! | (room closed) | `playerDisconnected` | whole room           |
//!
//! Whether a guess is right, or a round result plausible, is for the two
//! clients to agree on.

use marquee_protocol::{
    ClientEvent, LetterAttempt, ProtocolError, Recipient, RoomCode, RoomRef, ServerEvent,
};
use marquee_transport::ConnectionId;

use crate::RoomRegistry;

/// Maps a game event from `sender` to its outbound form and scope.
///
/// # Errors
/// - [`ProtocolError::InvalidMessage`] if an opaque payload has no string
///   `roomCode`, or if `event` is a lifecycle event rather than a relayed
///   one.
pub fn route(
    sender: ConnectionId,
    event: ClientEvent,
) -> Result<(Recipient, ServerEvent), ProtocolError> {
    match event {
        ClientEvent::LetterGuess(guess) => {
            let code = guess.room_code.clone();
            Ok((
                Recipient::RoomExcept(code, sender),
                ServerEvent::LetterAttempt(LetterAttempt::from(guess)),
            ))
        }
        ClientEvent::MovieSet(movie) => Ok((
            Recipient::RoomExcept(movie.room_code.clone(), sender),
            ServerEvent::MovieSet(movie),
        )),
        ClientEvent::RoundResult(payload) => Ok((
            Recipient::RoomExcept(payload.room_code()?, sender),
            ServerEvent::RoundResult(payload),
        )),
        ClientEvent::StartRound(payload) => Ok((
            Recipient::Room(payload.room_code()?),
            ServerEvent::StartRound(payload),
        )),
        other => Err(ProtocolError::InvalidMessage(format!(
            "{} is not a relayed event",
            other.name()
        ))),
    }
}

/// The teardown notice sent when a room closes, addressed to everyone
/// still in it.
pub fn room_closed(code: RoomCode) -> (Recipient, ServerEvent) {
    (
        Recipient::Room(code.clone()),
        ServerEvent::PlayerDisconnected(RoomRef::new(code)),
    )
}

/// Expands a recipient scope into concrete connections using the current
/// seating. Unknown rooms expand to nobody.
pub fn resolve(registry: &RoomRegistry, recipient: &Recipient) -> Vec<ConnectionId> {
    match recipient {
        Recipient::Connection(id) => vec![*id],
        Recipient::Room(code) => registry.members(code),
        Recipient::RoomExcept(code, excluded) => registry
            .members(code)
            .into_iter()
            .filter(|id| id != excluded)
            .collect(),
    }
}
