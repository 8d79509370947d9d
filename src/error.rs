use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::message::MessageType;

/// Errors surfaced by the group exchange.
///
/// Any of these raised while a handshake is in flight is terminal for that
/// key exchange: the handshake context is released and the session is left in
/// its error state.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Received {message} in invalid state {state}")]
    ProtocolState {
        message: MessageType,
        state: &'static str,
    },

    #[error("Invalid {0} packet")]
    MalformedMessage(MessageType),

    #[error("Invalid dh group parameter: {0}")]
    ParameterOutOfRange(#[from] GroupRejection),

    #[error("Out of memory")]
    Allocation,

    #[error("Unable to open moduli file {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Host key: {0}")]
    HostKey(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Why a group, a public value or a group request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupRejection {
    #[error("p: {bits} not in [{min}:{max}]")]
    SizeOutOfRange { bits: u64, min: u32, max: u32 },

    #[error("p must be greater than one")]
    ModulusTooSmall,

    #[error("p must be odd")]
    ModulusEven,

    #[error("g must satisfy 1 < g < p-1")]
    GeneratorOutOfRange,

    #[error("public value must satisfy 1 < v < p-1")]
    PublicValueOutOfRange,

    #[error("inconsistent group size request [{min}:{preferred}:{max}]")]
    InvalidBounds { min: u32, preferred: u32, max: u32 },

    #[error("no suitable group for [{min}:{preferred}:{max}]")]
    NoSuitableGroup { min: u32, preferred: u32, max: u32 },

    #[error("invalid hex in {0}")]
    InvalidHex(&'static str),
}

/// One malformed line of the moduli database.
///
/// Never fatal: the line is logged, recorded and the scan continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid moduli entry line {line}: {kind}")]
pub struct ParseWarning {
    pub line: usize,
    pub kind: ParseWarningKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseWarningKind {
    #[error("expected 7 fields, got {0}")]
    FieldCount(usize),

    #[error("invalid number in field {0}")]
    InvalidNumber(&'static str),

    #[error("invalid hex in field {0}")]
    InvalidHex(&'static str),
}
