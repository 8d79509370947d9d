// DH-GEX Server Handshake Flow (RFC 4419):
//
// 1. Client sends KEX_DH_GEX_REQUEST (min, preferred, max)
//    - Server clamps the request into its own window and picks a group from
//      the moduli database, or the built-in group if allowed
// 2. Server sends KEX_DH_GEX_GROUP (p, g)
// 3. Client sends KEX_DH_GEX_INIT (e)
//    - Server checks e, generates y, computes K = e^y mod p and H
// 4. Server sends KEX_DH_GEX_REPLY (K_S, f, signature over H)
//
// NEWKEYS belongs to the transport and is not handled here.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::Buf;
use crate::context::{HandshakeContext, KexOutput};
use crate::crypto::{EphemeralKeyPair, ExchangeHash, HostKeySigner, KexTranscript};
use crate::error::GroupRejection;
use crate::group::{fallback_group, DhGroup, GroupSizeBounds};
use crate::message::{decode, GexGroup, GexInit, GexReply, GexRequest, MessageType};
use crate::moduli::ModuliSelector;
use crate::rng::SeededRng;
use crate::state::ServerState;
use crate::{Config, Error, PacketStatus};

/// Responding side of a group exchange.
pub struct Server {
    config: Arc<Config>,

    /// Current server state.
    state: ServerState,

    /// Version strings and KEXINIT payloads, until the request arrives.
    transcript: Option<KexTranscript>,

    /// The exchange in progress, if any.
    context: Option<HandshakeContext>,

    /// The server host key.
    signer: Box<dyn HostKeySigner>,

    /// Drives both the moduli draw and the ephemeral secret.
    rng: SeededRng,

    /// Queue of outgoing messages.
    queue_tx: VecDeque<Buf>,

    /// Set once the reply is sent.
    output: Option<KexOutput>,
}

impl Server {
    pub fn new(
        config: Arc<Config>,
        signer: Box<dyn HostKeySigner>,
        transcript: KexTranscript,
    ) -> Server {
        let rng = SeededRng::new(config.rng_seed());
        Server {
            config,
            state: ServerState::AwaitRequest,
            transcript: Some(transcript),
            context: None,
            signer,
            rng,
            queue_tx: VecDeque::new(),
            output: None,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Feed one inbound message.
    ///
    /// `SSH_MSG_KEX_DH_GEX_REQUEST` and `SSH_MSG_KEX_DH_GEX_INIT` are always
    /// consumed; on `Err` the exchange is abandoned and the server is in
    /// `Error` (unless it had already finished). Anything else is
    /// `NotHandled`.
    pub fn handle_packet(&mut self, packet: &[u8]) -> Result<PacketStatus, Error> {
        let Ok((body, message)) = MessageType::parse(packet) else {
            return Ok(PacketStatus::NotHandled);
        };

        let result = match message {
            MessageType::KexDhGexRequest => self.on_request_message(body),
            MessageType::KexDhGexInit => self.on_init_message(body),
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

    /// Take the exchange result once the reply has been sent.
    pub fn take_output(&mut self) -> Option<KexOutput> {
        self.output.take()
    }

    fn on_request_message(&mut self, body: &[u8]) -> Result<(), Error> {
        let message = MessageType::KexDhGexRequest;
        self.expect(message)?;

        let request = decode(message, body, GexRequest::parse)?;
        let bounds = request.bounds;
        debug!(
            "SSH_MSG_KEX_DH_GEX_REQUEST({}<{}<{}) received",
            bounds.min, bounds.preferred, bounds.max
        );

        bounds.check_ordered()?;

        let window = self.clamp(&bounds)?;
        let group = self.choose_group(&window)?;

        let transcript = self.transcript.take().ok_or(Error::ProtocolState {
            message,
            state: self.state.name(),
        })?;

        // The hash covers what the client asked for, not the clamped window.
        let mut ctx = HandshakeContext::new(bounds, transcript);

        let mut out = Buf::new();
        GexGroup::new(&group).serialize(&mut out);
        self.enqueue(out)?;
        debug!("SSH_MSG_KEX_DH_GEX_GROUP sent");

        ctx.group = Some(group);
        self.context = Some(ctx);
        self.transition(ServerState::GroupSent);
        Ok(())
    }

    fn on_init_message(&mut self, body: &[u8]) -> Result<(), Error> {
        debug!("SSH_MSG_KEX_DH_GEX_INIT received");

        let message = MessageType::KexDhGexInit;
        self.expect(message)?;

        let mut ctx = self.context.take().ok_or(Error::ProtocolState {
            message,
            state: self.state.name(),
        })?;
        let init = decode(message, body, GexInit::parse)?;

        let Some(group) = ctx.group.take() else {
            return Err(Error::ProtocolState {
                message,
                state: self.state.name(),
            });
        };

        group.validate_public_value(&init.e)?;

        let key_pair = EphemeralKeyPair::generate(&group, &mut self.rng)?;
        let shared_secret = key_pair.shared_secret(&group, &init.e);

        let host_key = self.signer.public_blob();

        let exchange_hash = ExchangeHash {
            transcript: &ctx.transcript,
            host_key: &host_key,
            bounds: &ctx.bounds,
            group: &group,
            e: &init.e,
            f: key_pair.public(),
            shared_secret: &shared_secret,
        }
        .compute();

        let signature = self.signer.sign(&exchange_hash).map_err(Error::HostKey)?;

        let mut out = Buf::new();
        GexReply::new(&host_key, key_pair.public().clone(), &signature).serialize(&mut out);
        self.enqueue(out)?;
        debug!("SSH_MSG_KEX_DH_GEX_REPLY sent");

        self.output = Some(KexOutput {
            group,
            shared_secret,
            exchange_hash,
            host_key,
        });
        self.transition(ServerState::ReplySent);
        Ok(())
    }

    /// Intersect the client's request with the configured window.
    fn clamp(&self, request: &GroupSizeBounds) -> Result<GroupSizeBounds, Error> {
        let own = self.config.group_size_bounds();

        let min = request.min.max(own.min);
        let max = request.max.min(own.max);
        if min > max {
            return Err(GroupRejection::NoSuitableGroup {
                min: request.min,
                preferred: request.preferred,
                max: request.max,
            }
            .into());
        }
        let preferred = request.preferred.clamp(min, max);

        Ok(GroupSizeBounds::new(min, preferred, max))
    }

    fn choose_group(&mut self, bounds: &GroupSizeBounds) -> Result<DhGroup, Error> {
        let selector = ModuliSelector::new(*bounds);

        let failure = match selector.select_from(self.config.moduli(), &mut self.rng) {
            Ok(selection) => match selection.group {
                Some(selected) => return Ok(selected.group),
                None => Error::from(GroupRejection::NoSuitableGroup {
                    min: bounds.min,
                    preferred: bounds.preferred,
                    max: bounds.max,
                }),
            },
            Err(e @ Error::SourceUnavailable { .. }) => {
                warn!("{}", e);
                e
            }
            Err(e) => return Err(e),
        };

        if !self.config.fallback_group() {
            return Err(failure);
        }

        match fallback_group(bounds) {
            Some(group) => {
                warn!("Using built-in {} bits group", group.bits());
                Ok(group)
            }
            None => Err(failure),
        }
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

    fn enqueue(&mut self, buf: Buf) -> Result<(), Error> {
        self.queue_tx
            .try_reserve(1)
            .map_err(|_| Error::Allocation)?;
        self.queue_tx.push_back(buf);
        Ok(())
    }

    fn transition(&mut self, next: ServerState) {
        debug_assert!(
            self.state.can_transition(next),
            "{:?} -> {:?}",
            self.state,
            next
        );
        trace!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn abort(&mut self, error: Error) -> Error {
        if !self.state.is_terminal() {
            self.context = None;
            self.transcript = None;
            self.output = None;
            self.transition(ServerState::Error);
        }
        warn!("Key exchange failed: {}", error);
        error
    }
}
