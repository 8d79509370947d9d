use std::fmt;

use num_bigint::{BigUint, RandBigInt};
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::error::GroupRejection;
use crate::group::DhGroup;
use crate::Error;

/// Ephemeral Diffie-Hellman key pair for one exchange.
///
/// The secret exponent is held as big endian bytes that are wiped on drop.
pub struct EphemeralKeyPair {
    secret: Zeroizing<Vec<u8>>,
    public: BigUint,
}

impl EphemeralKeyPair {
    /// Generate a secret `x` in `[2, p-1)` and the public value `g^x mod p`.
    pub fn generate<R>(group: &DhGroup, rng: &mut R) -> Result<Self, Error>
    where
        R: Rng + CryptoRng,
    {
        let two = BigUint::from(2u32);
        let pmin1 = &group.p - &BigUint::from(1u32);
        if pmin1 <= two {
            return Err(GroupRejection::ModulusTooSmall.into());
        }

        let private_key = rng.gen_biguint_range(&two, &pmin1);

        // Compute public key as g^private_key mod p
        let public = group.g.modpow(&private_key, &group.p);

        Ok(EphemeralKeyPair {
            secret: Zeroizing::new(private_key.to_bytes_be()),
            public,
        })
    }

    /// The public value (`e` for a client, `f` for a server).
    pub fn public(&self) -> &BigUint {
        &self.public
    }

    /// Compute the shared secret `K = peer^x mod p` as big endian bytes.
    ///
    /// The caller is expected to have checked `peer` with
    /// [`DhGroup::validate_public_value`].
    pub fn shared_secret(&self, group: &DhGroup, peer: &BigUint) -> Zeroizing<Vec<u8>> {
        let private_key = BigUint::from_bytes_be(&self.secret);
        let shared = peer.modpow(&private_key, &group.p);
        Zeroizing::new(shared.to_bytes_be())
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn group() -> DhGroup {
        // 2^127 - 1 is prime; good enough to exercise the arithmetic.
        let p = (BigUint::from(1u32) << 127usize) - BigUint::from(1u32);
        DhGroup::new(p, BigUint::from(3u32))
    }

    #[test]
    fn both_sides_agree() {
        let group = group();
        let mut rng = StdRng::seed_from_u64(7);

        let a = EphemeralKeyPair::generate(&group, &mut rng).unwrap();
        let b = EphemeralKeyPair::generate(&group, &mut rng).unwrap();
        assert_ne!(a.public(), b.public());

        let ka = a.shared_secret(&group, b.public());
        let kb = b.shared_secret(&group, a.public());
        assert_eq!(*ka, *kb);
    }

    #[test]
    fn public_value_is_in_range() {
        let group = group();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..16 {
            let kp = EphemeralKeyPair::generate(&group, &mut rng).unwrap();
            assert!(group.validate_public_value(kp.public()).is_ok());
        }
    }

    #[test]
    fn tiny_modulus_is_refused() {
        let group = DhGroup::new(BigUint::from(3u32), BigUint::from(2u32));
        let mut rng = StdRng::seed_from_u64(9);
        assert!(matches!(
            EphemeralKeyPair::generate(&group, &mut rng),
            Err(Error::ParameterOutOfRange(GroupRejection::ModulusTooSmall))
        ));
    }

    #[test]
    fn debug_hides_secret() {
        let group = group();
        let mut rng = StdRng::seed_from_u64(10);
        let kp = EphemeralKeyPair::generate(&group, &mut rng).unwrap();
        let s = format!("{:?}", kp);
        assert!(!s.contains("secret"));
    }
}
