use nom::IResult;
use num_bigint::BigUint;

use super::{mpint, string, MessageType};
use crate::buffer::Buf;

/// `SSH_MSG_KEX_DH_GEX_REPLY`: server host key, public value `f` and the
/// signature over the exchange hash.
#[derive(Debug, PartialEq, Eq)]
pub struct GexReply<'a> {
    pub host_key: &'a [u8],
    pub f: BigUint,
    pub signature: &'a [u8],
}

impl<'a> GexReply<'a> {
    pub fn new(host_key: &'a [u8], f: BigUint, signature: &'a [u8]) -> Self {
        GexReply {
            host_key,
            f,
            signature,
        }
    }

    pub fn parse(input: &'a [u8]) -> IResult<&'a [u8], GexReply<'a>> {
        let (input, host_key) = string(input)?;
        let (input, f) = mpint(input)?;
        let (input, signature) = string(input)?;

        Ok((
            input,
            GexReply {
                host_key,
                f,
                signature,
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(MessageType::KexDhGexReply.as_u8());
        output.put_string(self.host_key);
        output.put_mpint(&self.f);
        output.put_string(self.signature);
    }
}
