#![forbid(unsafe_code)]
#![warn(clippy::all)]
// #![deny(missing_docs)]

//! Diffie-Hellman group exchange (RFC 4419) for SSH style transports.
//!
//! The crate is sans-IO. A [`Client`] or [`Server`] is fed one inbound
//! message at a time with `handle_packet` and produces outbound messages
//! through `poll_packet_tx`. Framing, encryption and KEXINIT negotiation are
//! left to the surrounding transport, which hands the versions and KEXINIT
//! payloads over in a [`KexTranscript`] and receives a [`KexOutput`] once
//! the exchange completes.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dhgex::crypto::RsaHostKeyVerifier;
//! use dhgex::{Client, Config, KexTranscript};
//!
//! let config = Arc::new(Config::default());
//! let mut client = Client::new(config, Box::new(RsaHostKeyVerifier));
//! client.start(KexTranscript::default()).unwrap();
//!
//! while let Some(message) = client.poll_packet_tx() {
//!     // send `message` to the server
//! }
//! ```

#[macro_use]
extern crate log;

mod buffer;
pub use buffer::Buf;

mod config;
pub use config::{Config, ConfigBuilder};

mod error;
pub use error::{Error, GroupRejection, ParseWarning, ParseWarningKind};

mod rng;
pub use rng::SeededRng;

pub mod crypto;
pub use crypto::KexTranscript;

pub mod group;
pub use group::{validate_group, DhGroup, GroupSizeBounds};

pub mod message;
pub mod moduli;

pub mod state;
pub use state::{ClientState, ServerState};

mod context;
pub use context::{KexOutput, PeerExchangeData};

mod client;
pub use client::Client;

mod server;
pub use server::Server;

/// Whether `handle_packet` consumed a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketStatus {
    /// The message was part of the group exchange.
    Used,
    /// Not a group exchange message for this side; left to the caller.
    NotHandled,
}
