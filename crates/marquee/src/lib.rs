//! # Marquee
//!
//! Relay server for a two-player movie guessing game.
//!
//! A host creates a room under a short code, one guest joins it, and from
//! then on the server forwards gameplay events between the two. It keeps no
//! game state: whatever the clients say about letters, movies and rounds is
//! passed along untouched.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marquee::prelude::*;
//!
//! # async fn start() -> Result<(), MarqueeError> {
//! let server = MarqueeServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod hub;
mod server;

pub use config::{ConfigError, DEFAULT_HOST, DEFAULT_PORT, ServerConfig};
pub use error::MarqueeError;
pub use server::{MarqueeServer, MarqueeServerBuilder};

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::{ConfigError, MarqueeError, MarqueeServer, MarqueeServerBuilder, ServerConfig};
    pub use marquee_protocol::{
        ClientEvent, Codec, JsonCodec, ProtocolError, RoomCode, RoomRef, ServerEvent,
    };
    pub use marquee_transport::{ConnectionId, TransportError};
}
