//! Wire messages of the Diffie-Hellman group exchange (RFC 4419).
//!
//! Every message starts with a one byte message id. The `parse` functions of
//! the individual messages take the body that follows that id, while
//! `serialize` writes the complete message, id included.

mod gex_group;
mod gex_init;
mod gex_reply;
mod gex_request;
mod new_keys;

pub use gex_group::GexGroup;
pub use gex_init::GexInit;
pub use gex_reply::GexReply;
pub use gex_request::GexRequest;
pub use new_keys::NewKeys;

use std::fmt;

use nom::error::{Error as NomError, ErrorKind};
use nom::multi::length_data;
use nom::number::complete::{be_u32, be_u8};
use nom::{Err, IResult};
use num_bigint::BigUint;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    NewKeys,
    KexDhGexGroup,
    KexDhGexInit,
    KexDhGexReply,
    KexDhGexRequest,
    Unknown(u8),
}

impl MessageType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            21 => MessageType::NewKeys,
            31 => MessageType::KexDhGexGroup,
            32 => MessageType::KexDhGexInit,
            33 => MessageType::KexDhGexReply,
            34 => MessageType::KexDhGexRequest,
            _ => MessageType::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            MessageType::NewKeys => 21,
            MessageType::KexDhGexGroup => 31,
            MessageType::KexDhGexInit => 32,
            MessageType::KexDhGexReply => 33,
            MessageType::KexDhGexRequest => 34,
            MessageType::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], MessageType> {
        let (input, value) = be_u8(input)?;
        Ok((input, Self::from_u8(value)))
    }

    pub fn name(&self) -> &'static str {
        match self {
            MessageType::NewKeys => "SSH_MSG_NEWKEYS",
            MessageType::KexDhGexGroup => "SSH_MSG_KEX_DH_GEX_GROUP",
            MessageType::KexDhGexInit => "SSH_MSG_KEX_DH_GEX_INIT",
            MessageType::KexDhGexReply => "SSH_MSG_KEX_DH_GEX_REPLY",
            MessageType::KexDhGexRequest => "SSH_MSG_KEX_DH_GEX_REQUEST",
            MessageType::Unknown(_) => "unknown message",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Unknown(v) => write!(f, "unknown message {}", v),
            _ => f.write_str(self.name()),
        }
    }
}

/// SSH `string`: `uint32` length followed by that many bytes.
pub(crate) fn string(input: &[u8]) -> IResult<&[u8], &[u8]> {
    length_data(be_u32)(input)
}

/// SSH `mpint`, restricted to non-negative values.
pub(crate) fn mpint(input: &[u8]) -> IResult<&[u8], BigUint> {
    let (rest, bytes) = string(input)?;
    if bytes.first().map(|b| b & 0x80 != 0).unwrap_or(false) {
        // Nothing in the group exchange is allowed to be negative.
        return Err(Err::Failure(NomError::new(input, ErrorKind::Verify)));
    }
    Ok((rest, BigUint::from_bytes_be(bytes)))
}

/// Run a body parser and map any failure to [`Error::MalformedMessage`].
pub(crate) fn decode<'a, T>(
    message: MessageType,
    body: &'a [u8],
    parser: impl FnOnce(&'a [u8]) -> IResult<&'a [u8], T>,
) -> Result<T, Error> {
    parser(body)
        .map(|(_, value)| value)
        .map_err(|_| Error::MalformedMessage(message))
}
