use nom::IResult;
use num_bigint::BigUint;

use super::{mpint, MessageType};
use crate::buffer::Buf;

/// `SSH_MSG_KEX_DH_GEX_INIT`: the client public value `e`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GexInit {
    pub e: BigUint,
}

impl GexInit {
    pub fn new(e: BigUint) -> Self {
        GexInit { e }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], GexInit> {
        let (input, e) = mpint(input)?;
        Ok((input, GexInit { e }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(MessageType::KexDhGexInit.as_u8());
        output.put_mpint(&self.e);
    }
}
