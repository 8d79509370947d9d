//! Handshake states and their transition tables.
//!
//! Both sides move strictly forward through their states. Any state that is
//! not terminal may jump to `Error`; the terminal states never change.

use crate::message::MessageType;

/// States of the initiating side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No exchange in progress.
    Idle,
    /// `SSH_MSG_KEX_DH_GEX_REQUEST` sent, awaiting the group.
    RequestSent,
    /// `SSH_MSG_KEX_DH_GEX_INIT` sent, awaiting the reply.
    InitSent,
    /// `SSH_MSG_NEWKEYS` sent. Terminal success.
    NewKeysSent,
    /// Terminal failure.
    Error,
}

impl ClientState {
    pub fn name(&self) -> &'static str {
        match self {
            ClientState::Idle => "Idle",
            ClientState::RequestSent => "RequestSent",
            ClientState::InitSent => "InitSent",
            ClientState::NewKeysSent => "NewKeysSent",
            ClientState::Error => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ClientState::NewKeysSent | ClientState::Error)
    }

    /// The inbound message this state accepts, if any.
    pub fn expects(&self) -> Option<MessageType> {
        match self {
            ClientState::RequestSent => Some(MessageType::KexDhGexGroup),
            ClientState::InitSent => Some(MessageType::KexDhGexReply),
            _ => None,
        }
    }

    /// Whether `self -> next` is in the transition table.
    pub fn can_transition(&self, next: ClientState) -> bool {
        use ClientState::*;
        matches!(
            (*self, next),
            (Idle, RequestSent)
                | (RequestSent, InitSent)
                | (InitSent, NewKeysSent)
                | (Idle | RequestSent | InitSent, Error)
        )
    }
}

/// States of the responding side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Awaiting `SSH_MSG_KEX_DH_GEX_REQUEST`.
    AwaitRequest,
    /// `SSH_MSG_KEX_DH_GEX_GROUP` sent, awaiting the client public value.
    GroupSent,
    /// `SSH_MSG_KEX_DH_GEX_REPLY` sent. Terminal success.
    ReplySent,
    /// Terminal failure.
    Error,
}

impl ServerState {
    pub fn name(&self) -> &'static str {
        match self {
            ServerState::AwaitRequest => "AwaitRequest",
            ServerState::GroupSent => "GroupSent",
            ServerState::ReplySent => "ReplySent",
            ServerState::Error => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerState::ReplySent | ServerState::Error)
    }

    /// The inbound message this state accepts, if any.
    pub fn expects(&self) -> Option<MessageType> {
        match self {
            ServerState::AwaitRequest => Some(MessageType::KexDhGexRequest),
            ServerState::GroupSent => Some(MessageType::KexDhGexInit),
            _ => None,
        }
    }

    /// Whether `self -> next` is in the transition table.
    pub fn can_transition(&self, next: ServerState) -> bool {
        use ServerState::*;
        matches!(
            (*self, next),
            (AwaitRequest, GroupSent) | (GroupSent, ReplySent) | (AwaitRequest | GroupSent, Error)
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const CLIENT_STATES: [ClientState; 5] = [
        ClientState::Idle,
        ClientState::RequestSent,
        ClientState::InitSent,
        ClientState::NewKeysSent,
        ClientState::Error,
    ];

    #[test]
    fn client_never_regresses() {
        for (i, from) in CLIENT_STATES.iter().enumerate() {
            for to in &CLIENT_STATES[..=i] {
                assert!(!from.can_transition(*to), "{:?} -> {:?}", from, to);
            }
        }
    }

    #[test]
    fn client_terminal_states_are_sticky() {
        for from in [ClientState::NewKeysSent, ClientState::Error] {
            for to in CLIENT_STATES {
                assert!(!from.can_transition(to));
            }
        }
    }

    #[test]
    fn client_forward_path() {
        assert!(ClientState::Idle.can_transition(ClientState::RequestSent));
        assert!(ClientState::RequestSent.can_transition(ClientState::InitSent));
        assert!(ClientState::InitSent.can_transition(ClientState::NewKeysSent));
        assert!(!ClientState::Idle.can_transition(ClientState::InitSent));
        assert!(ClientState::Idle.can_transition(ClientState::Error));
    }

    #[test]
    fn expected_messages() {
        assert_eq!(
            ClientState::RequestSent.expects(),
            Some(MessageType::KexDhGexGroup)
        );
        assert_eq!(ClientState::Idle.expects(), None);
        assert_eq!(
            ServerState::GroupSent.expects(),
            Some(MessageType::KexDhGexInit)
        );
        assert_eq!(ServerState::ReplySent.expects(), None);
    }

    #[test]
    fn server_table() {
        assert!(ServerState::AwaitRequest.can_transition(ServerState::GroupSent));
        assert!(ServerState::GroupSent.can_transition(ServerState::ReplySent));
        assert!(!ServerState::GroupSent.can_transition(ServerState::AwaitRequest));
        assert!(!ServerState::ReplySent.can_transition(ServerState::Error));
        assert!(!ServerState::Error.can_transition(ServerState::AwaitRequest));
    }
}
