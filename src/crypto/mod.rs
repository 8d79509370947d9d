//! Cryptographic pieces of the group exchange.
//!
//! Modular arithmetic is done with `num-bigint`, the exchange hash with
//! `sha2`. Host keys are pluggable through [`HostKeyVerifier`] and
//! [`HostKeySigner`]; an ssh-rsa implementation is provided.

mod exchange_hash;
mod host_key;
mod key_exchange;
mod ssh_rsa;

pub use exchange_hash::{ExchangeHash, KexTranscript};
pub use host_key::{HostKeySigner, HostKeyVerifier, ImportedHostKey};
pub use key_exchange::EphemeralKeyPair;
pub use ssh_rsa::{RsaHostKey, RsaHostKeySigner, RsaHostKeyVerifier};
