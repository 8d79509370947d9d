use nom::IResult;
use num_bigint::BigUint;

use super::{mpint, MessageType};
use crate::buffer::Buf;
use crate::group::DhGroup;

/// `SSH_MSG_KEX_DH_GEX_GROUP`: the modulus and generator picked by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GexGroup {
    pub p: BigUint,
    pub g: BigUint,
}

impl GexGroup {
    pub fn new(group: &DhGroup) -> Self {
        GexGroup {
            p: group.p.clone(),
            g: group.g.clone(),
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], GexGroup> {
        let (input, p) = mpint(input)?;
        let (input, g) = mpint(input)?;
        Ok((input, GexGroup { p, g }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(MessageType::KexDhGexGroup.as_u8());
        output.put_mpint(&self.p);
        output.put_mpint(&self.g);
    }

    pub fn into_group(self) -> DhGroup {
        DhGroup::new(self.p, self.g)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_group() {
        let message: &[u8] = &[
            0x00, 0x00, 0x00, 0x02, 0x00, 0xE3, // p = 227
            0x00, 0x00, 0x00, 0x01, 0x02, // g = 2
        ];
        let (rest, parsed) = GexGroup::parse(message).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.p, BigUint::from(227u32));
        assert_eq!(parsed.g, BigUint::from(2u32));

        let mut out = Buf::new();
        parsed.serialize(&mut out);
        assert_eq!(out[0], 31);
        assert_eq!(&out[1..], message);
    }

    #[test]
    fn missing_generator_is_rejected() {
        let message: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x17];
        assert!(GexGroup::parse(message).is_err());
    }
}
