use std::fmt;

use num_bigint::BigUint;
use zeroize::Zeroizing;

use crate::crypto::{EphemeralKeyPair, KexTranscript};
use crate::group::{DhGroup, GroupSizeBounds};

/// State of one in-flight key exchange.
///
/// Owned by the client or server for the lifetime of the exchange and moved
/// into each message handler. A handler that fails drops it, which releases
/// the group and wipes the ephemeral secret; only a handler that succeeds
/// puts it back.
#[derive(Debug)]
pub(crate) struct HandshakeContext {
    pub bounds: GroupSizeBounds,
    pub transcript: KexTranscript,
    pub group: Option<DhGroup>,
    pub key_pair: Option<EphemeralKeyPair>,
    pub peer: Option<PeerExchangeData>,
}

impl HandshakeContext {
    pub fn new(bounds: GroupSizeBounds, transcript: KexTranscript) -> Self {
        HandshakeContext {
            bounds,
            transcript,
            group: None,
            key_pair: None,
            peer: None,
        }
    }
}

/// What the server sent in its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerExchangeData {
    pub public_value: BigUint,
    pub host_key: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Result of a completed exchange, handed to the transport for key
/// derivation.
pub struct KexOutput {
    /// The agreed group.
    pub group: DhGroup,
    /// `K`, unsigned big endian.
    pub shared_secret: Zeroizing<Vec<u8>>,
    /// `H`, which also becomes the session id on the first exchange.
    pub exchange_hash: Vec<u8>,
    /// The server host key blob `K_S`.
    pub host_key: Vec<u8>,
}

impl fmt::Debug for KexOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KexOutput")
            .field("group_bits", &self.group.bits())
            .field("exchange_hash", &self.exchange_hash)
            .finish_non_exhaustive()
    }
}
