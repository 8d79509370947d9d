use nom::number::complete::be_u32;
use nom::IResult;

use super::MessageType;
use crate::buffer::Buf;
use crate::group::GroupSizeBounds;

/// `SSH_MSG_KEX_DH_GEX_REQUEST`: the group sizes the client will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GexRequest {
    pub bounds: GroupSizeBounds,
}

impl GexRequest {
    pub fn new(bounds: GroupSizeBounds) -> Self {
        GexRequest { bounds }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], GexRequest> {
        let (input, min) = be_u32(input)?;
        let (input, preferred) = be_u32(input)?;
        let (input, max) = be_u32(input)?;

        let bounds = GroupSizeBounds::new(min, preferred, max);
        Ok((input, GexRequest { bounds }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(MessageType::KexDhGexRequest.as_u8());
        output.put_u32(self.bounds.min);
        output.put_u32(self.bounds.preferred);
        output.put_u32(self.bounds.max);
    }
}
