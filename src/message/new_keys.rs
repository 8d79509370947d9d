use super::MessageType;
use crate::buffer::Buf;

/// `SSH_MSG_NEWKEYS`. Carries nothing but its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NewKeys;

impl NewKeys {
    pub fn serialize(&self, output: &mut Buf) {
        output.push(MessageType::NewKeys.as_u8());
    }
}
