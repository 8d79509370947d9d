//! Group parameters and their validation.
//!
//! The checks here are surface checks only. Primality and safe-prime status
//! of a received modulus are trusted to the peer (or to the moduli database);
//! what is verified is the negotiated size window, that `p` is an odd number
//! greater than one, and that the generator lies in `(1, p-1)`.

use num_bigint::BigUint;
use once_cell::sync::Lazy;

use crate::error::GroupRejection;

/// Smallest group the client asks for by default.
pub const DH_PMIN: u32 = 2048;
/// Preferred group size the client asks for by default.
pub const DH_PREQ: u32 = 2048;
/// Largest group the client asks for by default.
pub const DH_PMAX: u32 = 8192;

/// Group sizes, in bits, as carried by `SSH_MSG_KEX_DH_GEX_REQUEST`.
///
/// `min <= preferred <= max` is expected but only enforced by
/// [`ConfigBuilder::build`](crate::ConfigBuilder::build) and by the server
/// when it receives a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSizeBounds {
    pub min: u32,
    pub preferred: u32,
    pub max: u32,
}

impl GroupSizeBounds {
    pub const fn new(min: u32, preferred: u32, max: u32) -> Self {
        GroupSizeBounds {
            min,
            preferred,
            max,
        }
    }

    /// Whether a group of `bits` lies within `[min, max]`.
    pub fn contains(&self, bits: u64) -> bool {
        bits >= self.min as u64 && bits <= self.max as u64
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.preferred && self.preferred <= self.max
    }

    pub(crate) fn check_ordered(&self) -> Result<(), GroupRejection> {
        if self.is_ordered() {
            Ok(())
        } else {
            Err(GroupRejection::InvalidBounds {
                min: self.min,
                preferred: self.preferred,
                max: self.max,
            })
        }
    }
}

impl Default for GroupSizeBounds {
    fn default() -> Self {
        GroupSizeBounds::new(DH_PMIN, DH_PREQ, DH_PMAX)
    }
}

/// A Diffie-Hellman modulus and generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhGroup {
    pub p: BigUint,
    pub g: BigUint,
}

impl DhGroup {
    pub fn new(p: BigUint, g: BigUint) -> Self {
        DhGroup { p, g }
    }

    /// Parse a group from the hex strings used by the moduli database.
    pub fn from_hex(modulus: &str, generator: &str) -> Result<Self, GroupRejection> {
        let p = BigUint::parse_bytes(modulus.as_bytes(), 16)
            .ok_or(GroupRejection::InvalidHex("modulus"))?;
        let g = BigUint::parse_bytes(generator.as_bytes(), 16)
            .ok_or(GroupRejection::InvalidHex("generator"))?;
        Ok(DhGroup { p, g })
    }

    /// Bit length of the modulus.
    pub fn bits(&self) -> u64 {
        self.p.bits()
    }

    /// Validate the group against the requested size window.
    ///
    /// Any failing check rejects the whole group.
    pub fn validate(&self, bounds: &GroupSizeBounds) -> Result<(), GroupRejection> {
        let one = BigUint::from(1u32);

        let bits = self.bits();
        if !bounds.contains(bits) {
            return Err(GroupRejection::SizeOutOfRange {
                bits,
                min: bounds.min,
                max: bounds.max,
            });
        }

        if self.p <= one {
            return Err(GroupRejection::ModulusTooSmall);
        }

        // A prime that large is never divisible by 2.
        if !self.p.bit(0) {
            return Err(GroupRejection::ModulusEven);
        }

        let pmin1 = &self.p - &one;
        if self.g <= one || self.g >= pmin1 {
            return Err(GroupRejection::GeneratorOutOfRange);
        }

        Ok(())
    }

    /// Check a peer public value (`e` or `f`) lies in `(1, p-1)`.
    pub fn validate_public_value(&self, value: &BigUint) -> Result<(), GroupRejection> {
        let one = BigUint::from(1u32);
        if *value <= one || *value >= &self.p - &one {
            return Err(GroupRejection::PublicValueOutOfRange);
        }
        Ok(())
    }
}

/// Validate a received `(p, g)` against `bounds`. See [`DhGroup::validate`].
pub fn validate_group(group: &DhGroup, bounds: &GroupSizeBounds) -> Result<(), GroupRejection> {
    group.validate(bounds)
}

/// RFC 3526 2048-bit MODP group (group 14), generator 2.
static GROUP14: Lazy<DhGroup> = Lazy::new(|| {
    const P: &str = "\
        FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
        29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
        EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
        E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
        EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D\
        C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F\
        83655D23DCA3AD961C62F356208552BB9ED529077096966D\
        670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
        E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9\
        DE2BCBF6955817183995497CEA956AE515D2261898FA0510\
        15728E5A8AACAA68FFFFFFFFFFFFFFFF";

    // unwrap: constant is valid hex
    let p = BigUint::parse_bytes(P.as_bytes(), 16).unwrap();
    DhGroup::new(p, BigUint::from(2u32))
});

/// The built-in group to use when the moduli database has nothing to offer.
///
/// Returns `None` if the built-in group does not fit in `bounds`.
pub fn fallback_group(bounds: &GroupSizeBounds) -> Option<DhGroup> {
    let group = &*GROUP14;
    if bounds.contains(group.bits()) {
        Some(group.clone())
    } else {
        None
    }
}
