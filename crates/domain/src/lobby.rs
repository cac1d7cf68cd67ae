//! Per-user lobby state machine: invite / accept / reject / start / cancel.
//!
//! A hand-written tagged enum plus a `transition` match: explicit state
//! machines over a decorator-driven library. Side effects on the
//! registries (creating/joining/leaving a session) are
//! the caller's responsibility; this machine only tracks which state a user
//! is in and which session id (if any) that state refers to.

use crate::error::DomainError;
use crate::ids::SessionId;

/// A user's position in the pre-game flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyState {
    Start,
    Unjoined,
    WaitingForAccepts { session: SessionId },
    Invited { session: SessionId },
    Accepted { session: SessionId },
    SessionStarted { session: SessionId },
}

/// Inputs the lobby machine accepts. Each carries whatever data the
/// transition needs; states with no useful payload (e.g. `Cancel`) carry
/// none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyInput {
    Initialize,
    CreateSession { session: SessionId },
    ReceiveInvitation { session: SessionId },
    SendInvitation,
    StartSession,
    Cancel,
    Accept,
    Reject,
    RevokeInvitation,
}

/// Serialized form of a `LobbyState`, used by transport migration to move a
/// user's lobby position from one application instance to another.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LobbyToken {
    Start,
    Unjoined,
    WaitingForAccepts { session: SessionId },
    Invited { session: SessionId },
    Accepted { session: SessionId },
    SessionStarted { session: SessionId },
}

impl LobbyState {
    pub fn serialize(&self) -> LobbyToken {
        match self {
            LobbyState::Start => LobbyToken::Start,
            LobbyState::Unjoined => LobbyToken::Unjoined,
            LobbyState::WaitingForAccepts { session } => LobbyToken::WaitingForAccepts {
                session: session.clone(),
            },
            LobbyState::Invited { session } => LobbyToken::Invited {
                session: session.clone(),
            },
            LobbyState::Accepted { session } => LobbyToken::Accepted {
                session: session.clone(),
            },
            LobbyState::SessionStarted { session } => LobbyToken::SessionStarted {
                session: session.clone(),
            },
        }
    }

    pub fn restore(token: LobbyToken) -> Self {
        match token {
            LobbyToken::Start => LobbyState::Start,
            LobbyToken::Unjoined => LobbyState::Unjoined,
            LobbyToken::WaitingForAccepts { session } => LobbyState::WaitingForAccepts { session },
            LobbyToken::Invited { session } => LobbyState::Invited { session },
            LobbyToken::Accepted { session } => LobbyState::Accepted { session },
            LobbyToken::SessionStarted { session } => LobbyState::SessionStarted { session },
        }
    }

    /// Applies `input`, returning the new state or an `InvalidTransition`
    /// if `input` is not defined for `self`. Does not invoke the observer;
    /// callers are expected to call `LobbyObserver::on_enter` themselves
    /// (see module docs and `restore`'s call site in the engine crate).
    pub fn transition(&self, input: LobbyInput) -> Result<LobbyState, DomainError> {
        use LobbyInput as I;
        use LobbyState as S;

        match (self, input) {
            (S::Start, I::Initialize) => Ok(S::Unjoined),
            (S::Unjoined, I::CreateSession { session }) => Ok(S::WaitingForAccepts { session }),
            (S::Unjoined, I::ReceiveInvitation { session }) => Ok(S::Invited { session }),
            (S::WaitingForAccepts { session }, I::SendInvitation) => {
                Ok(S::WaitingForAccepts { session: session.clone() })
            }
            (S::WaitingForAccepts { session }, I::StartSession) => {
                Ok(S::SessionStarted { session: session.clone() })
            }
            (S::WaitingForAccepts { .. }, I::Cancel) => Ok(S::Unjoined),
            (S::Invited { session }, I::Accept) => Ok(S::Accepted { session: session.clone() }),
            (S::Invited { .. }, I::Reject) => Ok(S::Unjoined),
            (S::Invited { .. }, I::RevokeInvitation) => Ok(S::Unjoined),
            (S::Accepted { session }, I::StartSession) => {
                Ok(S::SessionStarted { session: session.clone() })
            }
            (S::Accepted { .. }, I::Cancel) => Ok(S::Unjoined),
            (state, input) => Err(DomainError::invalid_transition(format!(
                "input {input:?} is not defined for state {state:?}"
            ))),
        }
    }

    pub fn session(&self) -> Option<&SessionId> {
        match self {
            LobbyState::Start | LobbyState::Unjoined => None,
            LobbyState::WaitingForAccepts { session }
            | LobbyState::Invited { session }
            | LobbyState::Accepted { session }
            | LobbyState::SessionStarted { session } => Some(session),
        }
    }
}

/// Called by the machine's driver on every state entry, including restores.
/// Implemented by the application adapter; the machine itself never touches
/// rendering or registries.
pub trait LobbyObserver {
    fn on_enter(&mut self, state: &LobbyState);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid() -> SessionId {
        SessionId::new("green-472")
    }

    #[test]
    fn full_happy_path_to_session_started() {
        let s = LobbyState::Start;
        let s = s.transition(LobbyInput::Initialize).unwrap();
        assert_eq!(s, LobbyState::Unjoined);
        let s = s
            .transition(LobbyInput::CreateSession { session: sid() })
            .unwrap();
        assert_eq!(s, LobbyState::WaitingForAccepts { session: sid() });
        let s = s.transition(LobbyInput::StartSession).unwrap();
        assert_eq!(s, LobbyState::SessionStarted { session: sid() });
    }

    #[test]
    fn invite_accept_path() {
        let s = LobbyState::Unjoined;
        let s = s
            .transition(LobbyInput::ReceiveInvitation { session: sid() })
            .unwrap();
        assert_eq!(s, LobbyState::Invited { session: sid() });
        let s = s.transition(LobbyInput::Accept).unwrap();
        assert_eq!(s, LobbyState::Accepted { session: sid() });
    }

    #[test]
    fn undefined_input_is_invalid_transition() {
        let s = LobbyState::Start;
        let err = s.transition(LobbyInput::Accept).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn serialize_restore_round_trips() {
        let s = LobbyState::WaitingForAccepts { session: sid() };
        let token = s.serialize();
        let restored = LobbyState::restore(token);
        assert_eq!(s, restored);
    }

    #[test]
    fn cancel_from_accepted_returns_to_unjoined() {
        let s = LobbyState::Accepted { session: sid() };
        let s = s.transition(LobbyInput::Cancel).unwrap();
        assert_eq!(s, LobbyState::Unjoined);
    }
}
