//! Room lifecycle and event relay for Marquee.
//!
//! Everything in this crate is synchronous and free of I/O. The server
//! crate wraps a [`Lobby`] in a single task and feeds it events in order.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: owns the code → room map and the seat index
//! - [`Room`] / [`Seat`] / [`Role`]: one paired session and its seats
//! - [`relay`]: recipient scopes for game events
//! - [`Lobby`]: lifecycle rules on top of the registry, producing
//!   [`Delivery`] lists

mod error;
mod lobby;
mod registry;
pub mod relay;
mod room;

pub use error::RoomError;
pub use lobby::{Delivery, Lobby};
pub use registry::RoomRegistry;
pub use room::{Role, Room, Seat};
