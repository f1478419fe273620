//! Unified error type for the Marquee server.

use marquee_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps the sub-crate errors.
///
/// Room outcomes (`RoomError`) and undecodable frames are not here: they
/// are answered with events, or dropped, inside the connection and never
/// reach the server loop.
#[derive(Debug, thiserror::Error)]
pub enum MarqueeError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Bad process configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
