//! Wire protocol for the Marquee relay.
//!
//! This crate defines the language clients and the server speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], payload structs,
//!   [`RoomCode`], [`Recipient`]): the events that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events become bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong doing so.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Room (registry + relay)
//! ```
//!
//! Nothing here knows about connections being alive or rooms existing.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientEvent, CreateRoom, GuestJoined, JoinRoom, JoinedSuccess, LetterAttempt, LetterGuess,
    MovieSet, OpaquePayload, Recipient, RejoinHost, RoomCode, RoomRef, ServerEvent,
};
