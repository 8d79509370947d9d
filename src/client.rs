// DH-GEX Client Handshake Flow (RFC 4419):
//
// 1. Client sends KEX_DH_GEX_REQUEST with (min, preferred, max) group sizes
// 2. Server sends KEX_DH_GEX_GROUP (p, g)
//    - Client checks the group against the requested window
// 3. Client sends KEX_DH_GEX_INIT (e = g^x mod p)
// 4. Server sends KEX_DH_GEX_REPLY (K_S, f, signature over H)
//    - Client imports K_S, computes K = f^x mod p and H, verifies the signature
// 5. Client sends NEWKEYS
//
// Any failure drops the handshake context and leaves the client in Error.
// There is no retry; a new exchange needs a new Client.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::Buf;
use crate::context::{HandshakeContext, KexOutput, PeerExchangeData};
use crate::crypto::{EphemeralKeyPair, ExchangeHash, HostKeyVerifier, KexTranscript};
use crate::group::GroupSizeBounds;
use crate::message::{decode, GexGroup, GexInit, GexReply, GexRequest, MessageType, NewKeys};
use crate::rng::SeededRng;
use crate::state::ClientState;
use crate::{Config, Error, PacketStatus};

/// Initiating side of a group exchange.
pub struct Client {
    config: Arc<Config>,

    /// Current client state.
    state: ClientState,

    /// The exchange in progress, if any.
    context: Option<HandshakeContext>,

    /// Imports the server host key and checks its signature.
    verifier: Box<dyn HostKeyVerifier>,

    /// Source of the ephemeral secret.
    rng: SeededRng,

    /// Queue of outgoing messages.
    queue_tx: VecDeque<Buf>,

    /// Set once NEWKEYS is sent.
    output: Option<KexOutput>,
}

impl Client {
    pub fn new(config: Arc<Config>, verifier: Box<dyn HostKeyVerifier>) -> Client {
        let rng = SeededRng::new(config.rng_seed());
        Client {
            config,
            state: ClientState::Idle,
            context: None,
            verifier,
            rng,
            queue_tx: VecDeque::new(),
            output: None,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Start the exchange with the configured group size bounds.
    pub fn start(&mut self, transcript: KexTranscript) -> Result<(), Error> {
        let bounds = self.config.group_size_bounds();
        self.initiate(bounds, transcript)
    }

    /// Start the exchange by queueing a `SSH_MSG_KEX_DH_GEX_REQUEST`.
    ///
    /// Only valid in `Idle`. On failure nothing is kept and the client stays
    /// in `Idle`.
    pub fn initiate(
        &mut self,
        bounds: GroupSizeBounds,
        transcript: KexTranscript,
    ) -> Result<(), Error> {
        if self.state != ClientState::Idle {
            return Err(Error::ProtocolState {
                message: MessageType::KexDhGexRequest,
                state: self.state.name(),
            });
        }

        let context = HandshakeContext::new(bounds, transcript);

        let mut out = Buf::try_with_capacity(13)?;
        GexRequest::new(bounds).serialize(&mut out);
        self.enqueue(out)?;

        debug!(
            "SSH_MSG_KEX_DH_GEX_REQUEST({}<{}<{}) sent",
            bounds.min, bounds.preferred, bounds.max
        );

        self.context = Some(context);
        self.transition(ClientState::RequestSent);
        Ok(())
    }

    /// Feed one inbound message.
    ///
    /// Returns `NotHandled` for messages that are not part of the client side
    /// of the group exchange; those are left to the caller. For
    /// `SSH_MSG_KEX_DH_GEX_GROUP` and `SSH_MSG_KEX_DH_GEX_REPLY` the message
    /// is always consumed: on `Err` the exchange is abandoned and the client
    /// is in `Error` (unless it had already finished).
    pub fn handle_packet(&mut self, packet: &[u8]) -> Result<PacketStatus, Error> {
        let Ok((body, message)) = MessageType::parse(packet) else {
            return Ok(PacketStatus::NotHandled);
        };

        let result = match message {
            MessageType::KexDhGexGroup => self.on_group_message(body),
            MessageType::KexDhGexReply => self.on_reply_message(body),
            _ => return Ok(PacketStatus::NotHandled),
        };

        match result {
            Ok(()) => Ok(PacketStatus::Used),
            Err(e) => Err(self.abort(e)),
        }
    }

    /// Next message to send, if any.
    pub fn poll_packet_tx(&mut self) -> Option<Buf> {
        self.queue_tx.pop_front()
    }

    /// Take the exchange result once NEWKEYS has been sent.
    pub fn take_output(&mut self) -> Option<KexOutput> {
        self.output.take()
    }

    fn on_group_message(&mut self, body: &[u8]) -> Result<(), Error> {
        debug!("SSH_MSG_KEX_DH_GEX_GROUP received");

        self.expect(MessageType::KexDhGexGroup)?;
        let mut ctx = self.take_context(MessageType::KexDhGexGroup)?;

        let group = decode(MessageType::KexDhGexGroup, body, GexGroup::parse)?.into_group();

        // basic checks
        group.validate(&ctx.bounds)?;

        // compute and send DH public parameter
        let key_pair = EphemeralKeyPair::generate(&group, &mut self.rng)?;

        let mut out = Buf::new();
        GexInit::new(key_pair.public().clone()).serialize(&mut out);

        debug!("Accepted {} bits group", group.bits());
        ctx.group = Some(group);
        ctx.key_pair = Some(key_pair);

        self.enqueue(out)?;
        self.context = Some(ctx);
        self.transition(ClientState::InitSent);
        Ok(())
    }

    fn on_reply_message(&mut self, body: &[u8]) -> Result<(), Error> {
        debug!("SSH_MSG_KEX_DH_GEX_REPLY received");

        let message = MessageType::KexDhGexReply;
        if self.state.is_terminal() || self.config.strict_reply_state() {
            self.expect(message)?;
        } else if self.state != ClientState::InitSent {
            // Not gated on state; without key material this fails below.
            warn!(
                "SSH_MSG_KEX_DH_GEX_REPLY received in state {}",
                self.state.name()
            );
        }

        let mut ctx = self.take_context(message)?;
        let reply = decode(message, body, GexReply::parse)?;

        let host_key = self.verifier.import(reply.host_key).map_err(Error::HostKey)?;

        let (Some(group), Some(key_pair)) = (ctx.group.take(), ctx.key_pair.take()) else {
            debug!("Could not generate shared secret");
            return Err(Error::ProtocolState {
                message,
                state: self.state.name(),
            });
        };

        let peer = ctx.peer.insert(PeerExchangeData {
            public_value: reply.f,
            host_key: reply.host_key.to_vec(),
            signature: reply.signature.to_vec(),
        });

        group.validate_public_value(&peer.public_value)?;

        let shared_secret = key_pair.shared_secret(&group, &peer.public_value);

        let exchange_hash = ExchangeHash {
            transcript: &ctx.transcript,
            host_key: &peer.host_key,
            bounds: &ctx.bounds,
            group: &group,
            e: key_pair.public(),
            f: &peer.public_value,
            shared_secret: &shared_secret,
        }
        .compute();

        host_key
            .verify(&exchange_hash, &peer.signature)
            .map_err(Error::HostKey)?;

        let host_key = std::mem::take(&mut peer.host_key);

        // Send the MSG_NEWKEYS
        let mut out = Buf::try_with_capacity(1)?;
        NewKeys.serialize(&mut out);
        self.enqueue(out)?;
        debug!("SSH_MSG_NEWKEYS sent");

        self.output = Some(KexOutput {
            group,
            shared_secret,
            exchange_hash,
            host_key,
        });
        self.transition(ClientState::NewKeysSent);
        Ok(())
    }

    fn expect(&self, message: MessageType) -> Result<(), Error> {
        if self.state.expects() == Some(message) {
            Ok(())
        } else {
            Err(Error::ProtocolState {
                message,
                state: self.state.name(),
            })
        }
    }

    fn take_context(&mut self, message: MessageType) -> Result<HandshakeContext, Error> {
        self.context.take().ok_or(Error::ProtocolState {
            message,
            state: self.state.name(),
        })
    }

    fn enqueue(&mut self, buf: Buf) -> Result<(), Error> {
        self.queue_tx
            .try_reserve(1)
            .map_err(|_| Error::Allocation)?;
        self.queue_tx.push_back(buf);
        Ok(())
    }

    fn transition(&mut self, next: ClientState) {
        debug_assert!(
            self.state.can_transition(next),
            "{:?} -> {:?}",
            self.state,
            next
        );
        trace!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Tear down the exchange after a failure and hand the error back.
    fn abort(&mut self, error: Error) -> Error {
        // The terminal states never change.
        if !self.state.is_terminal() {
            self.context = None;
            self.output = None;
            self.transition(ClientState::Error);
        }
        warn!("Key exchange failed: {}", error);
        error
    }
}
