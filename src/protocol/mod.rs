//! Message protocol
//!
//! The messages exchanged with clients and the binary frame layout they
//! travel in. Inbound: `client-init` (subscribe) and `client-info`
//! (playback telemetry). Outbound: `server-hello`, `server-init`, and
//! chunked `video` / `audio` media frames.

pub mod error;
pub mod message;
pub mod wire;

pub use error::ProtocolError;
pub use message::{
    parse_client_message, ClientInfo, ClientInit, ClientMessage, MediaHeader, ServerHello,
    ServerInit,
};
pub use wire::{decode_frame, encode_frame, encode_prelude, HEADER_LEN_BYTES};
