#![no_main]

//! Fuzz target for group exchange message handling.
//!
//! Feeds the input to a client and a server in every state they can reach
//! without a peer, so each message parser and state gate sees it.

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use dhgex::crypto::{HostKeySigner, RsaHostKeyVerifier};
use dhgex::moduli::ModuliSource;
use dhgex::{Client, Config, GroupSizeBounds, KexTranscript, Server};

#[derive(Debug)]
struct NullSigner;

impl HostKeySigner for NullSigner {
    fn public_blob(&self) -> Vec<u8> {
        Vec::new()
    }

    fn sign(&self, _message: &[u8]) -> Result<Vec<u8>, String> {
        Ok(Vec::new())
    }
}

// 2^127 - 1 keeps the arithmetic cheap.
const MODULI: &str = "20240101000000 2 6 100 126 3 7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\n";

fuzz_target!(|data: &[u8]| {
    let config = Arc::new(
        Config::builder()
            .group_size_bounds(GroupSizeBounds::new(64, 127, 256))
            .moduli(ModuliSource::memory(MODULI))
            .fallback_group(false)
            .rng_seed(Some(0))
            .build()
            .unwrap(),
    );

    // Idle client
    let mut client = Client::new(Arc::clone(&config), Box::new(RsaHostKeyVerifier));
    let _ = client.handle_packet(data);

    // Client waiting for the group
    let mut client = Client::new(Arc::clone(&config), Box::new(RsaHostKeyVerifier));
    let _ = client.start(KexTranscript::default());
    let _ = client.handle_packet(data);
    let _ = client.handle_packet(data);

    // Server waiting for the request, then for init
    let mut server = Server::new(
        Arc::clone(&config),
        Box::new(NullSigner),
        KexTranscript::default(),
    );
    let _ = server.handle_packet(data);
    let _ = server.handle_packet(data);

    // Client waiting for the reply, with a group from a real server
    let mut server = Server::new(config.clone(), Box::new(NullSigner), KexTranscript::default());
    let mut client = Client::new(config, Box::new(RsaHostKeyVerifier));
    let _ = client.start(KexTranscript::default());
    while let Some(p) = client.poll_packet_tx() {
        let _ = server.handle_packet(&p);
    }
    while let Some(p) = server.poll_packet_tx() {
        let _ = client.handle_packet(&p);
    }
    let _ = client.handle_packet(data);
});
