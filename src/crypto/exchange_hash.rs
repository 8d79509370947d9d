use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::buffer::Buf;
use crate::group::{DhGroup, GroupSizeBounds};

/// Values from the surrounding transport that go into the exchange hash.
///
/// Version strings are without the trailing CR LF. KEXINIT payloads include
/// their message id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KexTranscript {
    pub client_version: Vec<u8>,
    pub server_version: Vec<u8>,
    pub client_kexinit: Vec<u8>,
    pub server_kexinit: Vec<u8>,
}

/// Inputs of the diffie-hellman-group-exchange-sha256 exchange hash
/// (RFC 4419 section 3).
#[derive(Debug)]
pub struct ExchangeHash<'a> {
    pub transcript: &'a KexTranscript,
    pub host_key: &'a [u8],
    pub bounds: &'a GroupSizeBounds,
    pub group: &'a DhGroup,
    pub e: &'a BigUint,
    pub f: &'a BigUint,
    pub shared_secret: &'a [u8],
}

impl ExchangeHash<'_> {
    pub fn compute(&self) -> Vec<u8> {
        let t = self.transcript;

        let mut data = Buf::new();
        data.put_string(&t.client_version);
        data.put_string(&t.server_version);
        data.put_string(&t.client_kexinit);
        data.put_string(&t.server_kexinit);
        data.put_string(self.host_key);
        data.put_u32(self.bounds.min);
        data.put_u32(self.bounds.preferred);
        data.put_u32(self.bounds.max);
        data.put_mpint(&self.group.p);
        data.put_mpint(&self.group.g);
        data.put_mpint(self.e);
        data.put_mpint(self.f);
        data.put_mpint_bytes(self.shared_secret);

        // K is in there.
        let data = Zeroizing::new(data.into_vec());
        Sha256::digest(&*data).to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn transcript() -> KexTranscript {
        KexTranscript {
            client_version: b"SSH-2.0-client".to_vec(),
            server_version: b"SSH-2.0-server".to_vec(),
            client_kexinit: vec![20, 1, 2, 3],
            server_kexinit: vec![20, 4, 5, 6],
        }
    }

    #[test]
    fn hash_is_deterministic_and_covers_inputs() {
        let t = transcript();
        let bounds = GroupSizeBounds::new(1024, 2048, 8192);
        let group = DhGroup::new(BigUint::from(227u32), BigUint::from(2u32));
        let e = BigUint::from(10u32);
        let f = BigUint::from(20u32);

        let h = ExchangeHash {
            transcript: &t,
            host_key: b"key",
            bounds: &bounds,
            group: &group,
            e: &e,
            f: &f,
            shared_secret: &[0x42],
        };

        let h1 = h.compute();
        assert_eq!(h1.len(), 32);
        assert_eq!(h1, h.compute());

        let other_f = BigUint::from(21u32);
        let h2 = ExchangeHash { f: &other_f, ..h }.compute();
        assert_ne!(h1, h2);

        let other_bounds = GroupSizeBounds::new(1024, 3072, 8192);
        let h3 = ExchangeHash {
            bounds: &other_bounds,
            ..h
        }
        .compute();
        assert_ne!(h1, h3);
    }
}
