//! Shared lobby side effects (§4.2): invite / accept / reject / start /
//! cancel, performed on the registries around the transition call itself,
//! keeping the state machine separate from its effects. Both
//! `TerminalApplication` and `WebApplication` drive these through their own
//! `LobbyState` field and `LobbyObserver` impl; only the registry/session-
//! bus plumbing lives here, grounded in the original's duplicated-by-design
//! `SSHLobbyProtocol`/`WebLobbyProtocol` pair (`lobby.py`), each of which
//! calls the same `users`/`session` module functions.

use std::sync::Arc;

use txwerewolves_domain::lobby::{LobbyInput, LobbyState};
use txwerewolves_domain::{RandomPort, SessionId, UserId};

use crate::error::EngineError;
use crate::registry::{SessionRegistry, UserRegistry};
use crate::signal::{Signal, SignalBus, SignalOptions};

/// The registries and bus every lobby action needs; held by reference from
/// each adapter's own fields so nothing here owns an extra copy.
pub struct LobbyCtx<'a> {
    pub users: &'a UserRegistry,
    pub sessions: &'a SessionRegistry,
    pub bus: &'a SignalBus,
    pub rng: &'a dyn RandomPort,
}

/// `Available Players:\n...` (§8 scenario 1), sorted, excluding no one.
pub fn list_players(users: &UserRegistry) -> String {
    let ids = users.user_ids();
    format!(
        "Available Players:\n{}",
        ids.iter()
            .map(UserId::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    )
}

/// Numbered listing of a session's current members, sorted (§4.2 "j"oined
/// command).
pub async fn joined_players(
    sessions: &SessionRegistry,
    session_id: &SessionId,
) -> Option<String> {
    let entry = sessions.get(session_id)?;
    let state = entry.state.lock().await;
    let mut members: Vec<&UserId> = state.members.iter().collect();
    members.sort();
    Some(
        members
            .iter()
            .enumerate()
            .map(|(n, m)| format!("{}) {}", n + 1, m))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Invites `target` into `inviter`'s session, creating one first if
/// `inviter` has none yet (ported from `lobby.py::_invite`). Delivers
/// `Signal::Invited` directly to `target`'s bound application, if any.
pub async fn invite_player(
    ctx: &LobbyCtx<'_>,
    inviter: &UserId,
    inviter_state: &LobbyState,
    target: &UserId,
) -> Result<(LobbyState, SessionId), EngineError> {
    let session_id = match inviter_state.session() {
        Some(id) => id.clone(),
        None => {
            let entry = ctx.sessions.create_session(inviter.clone(), ctx.rng)?;
            ctx.users
                .with_entry_mut(inviter, |e| e.set_joined(Some(entry.session_id.clone())));
            entry.session_id.clone()
        }
    };

    if let Some(entry) = ctx.sessions.get(&session_id) {
        let mut state = entry.state.lock().await;
        state.invited.insert(target.clone());
    }
    ctx.users
        .with_entry_mut(target, |e| e.set_invited(Some(session_id.clone())));

    if let Some(app) = ctx.users.with_entry(target, |e| e.app.clone()).flatten() {
        app.handle_signal(Signal::Invited {
            session: session_id.clone(),
            from: inviter.clone(),
        })
        .await;
    }

    let new_state = match inviter_state {
        LobbyState::Unjoined => inviter_state.transition(LobbyInput::CreateSession {
            session: session_id.clone(),
        })?,
        other => other.transition(LobbyInput::SendInvitation)?,
    };
    Ok((new_state, session_id))
}

/// Accepts a pending invitation (`lobby.py::_accept_invitation`).
pub async fn accept_invitation(
    ctx: &LobbyCtx<'_>,
    user_id: &UserId,
    session_id: &SessionId,
) -> Result<LobbyState, EngineError> {
    if let Some(entry) = ctx.sessions.get(session_id) {
        let mut state = entry.state.lock().await;
        state.invited.remove(user_id);
        state.members.insert(user_id.clone());
    }
    ctx.users.with_entry_mut(user_id, |e| {
        e.set_invited(None);
        e.set_joined(Some(session_id.clone()));
    });
    LobbyState::Invited {
        session: session_id.clone(),
    }
    .transition(LobbyInput::Accept)
}

/// Rejects a pending invitation (`lobby.py::_reject_invitation`).
pub async fn reject_invitation(
    ctx: &LobbyCtx<'_>,
    user_id: &UserId,
    session_id: &SessionId,
) -> Result<LobbyState, EngineError> {
    if let Some(entry) = ctx.sessions.get(session_id) {
        let mut state = entry.state.lock().await;
        state.invited.remove(user_id);
    }
    ctx.users.with_entry_mut(user_id, |e| e.set_invited(None));
    LobbyState::Invited {
        session: session_id.clone(),
    }
    .transition(LobbyInput::Reject)
}

/// The owner revokes an outstanding invitation before the invitee accepts.
/// Notifies the invitee directly so their machine drops back to `Unjoined`.
pub async fn revoke_invitation(
    ctx: &LobbyCtx<'_>,
    session_id: &SessionId,
    target: &UserId,
) -> Result<(), EngineError> {
    if let Some(entry) = ctx.sessions.get(session_id) {
        let mut state = entry.state.lock().await;
        state.invited.remove(target);
    }
    ctx.users.with_entry_mut(target, |e| e.set_invited(None));
    if let Some(app) = ctx.users.with_entry(target, |e| e.app.clone()).flatten() {
        app.handle_signal(Signal::InviteCancelled {
            user: target.clone(),
        })
        .await;
    }
    Ok(())
}

/// A member leaves an accepted-but-not-started session
/// (`lobby.py::_leave_session`). Destroys the session once it is empty.
pub async fn leave_session(
    ctx: &LobbyCtx<'_>,
    user_id: &UserId,
    session_id: &SessionId,
) -> Result<LobbyState, EngineError> {
    let now_empty = if let Some(entry) = ctx.sessions.get(session_id) {
        let mut state = entry.state.lock().await;
        state.members.remove(user_id);
        state.members.is_empty()
    } else {
        false
    };
    ctx.users.with_entry_mut(user_id, |e| e.set_joined(None));
    if now_empty {
        ctx.sessions.destroy_session(session_id);
    }
    LobbyState::Accepted {
        session: session_id.clone(),
    }
    .transition(LobbyInput::Cancel)
}

/// The owner cancels a session still waiting for accepts
/// (`lobby.py::_cancel_session`): destroys the session outright and tells
/// every member and invitee to fall back to the lobby.
pub async fn cancel_session(
    ctx: &LobbyCtx<'_>,
    owner: &UserId,
    session_id: &SessionId,
) -> Result<LobbyState, EngineError> {
    ctx.bus
        .send_signal(
            session_id,
            Signal::Shutdown {
                initiator: owner.clone(),
            },
            SignalOptions::new().include_invited(),
        )
        .await;
    ctx.sessions.destroy_session(session_id);
    LobbyState::WaitingForAccepts {
        session: session_id.clone(),
    }
    .transition(LobbyInput::Cancel)
}

/// Starts the game: deals cards with the session's pending settings and
/// tells every member's lobby machine to transition into the game view
/// (`lobby.py::_start_session`).
pub async fn start_session(
    ctx: &LobbyCtx<'_>,
    session_id: &SessionId,
    current: &LobbyState,
) -> Result<LobbyState, EngineError> {
    if let Some(entry) = ctx.sessions.get(session_id) {
        let mut state = entry.state.lock().await;
        if state.game.is_none() {
            let members: Vec<UserId> = state.members.iter().cloned().collect();
            let mut machine = txwerewolves_domain::game::GameMachine::new(members);
            let roles: Vec<_> = state.settings.roles.iter().copied().collect();
            machine.deal_cards(state.settings.werewolf_count, &roles, ctx.rng)?;
            state.game = Some(machine);
        }
    }
    ctx.bus
        .send_signal(session_id, Signal::SessionStarted, SignalOptions::new())
        .await;
    current.transition(LobbyInput::StartSession)
}

#[cfg(test)]
mod tests {
    use super::*;
    use txwerewolves_domain::random::FixedRandom;

    fn ctx<'a>(
        users: &'a UserRegistry,
        sessions: &'a SessionRegistry,
        bus: &'a SignalBus,
        rng: &'a FixedRandom,
    ) -> LobbyCtx<'a> {
        LobbyCtx {
            users,
            sessions,
            bus,
            rng,
        }
    }

    #[tokio::test]
    async fn invite_creates_a_session_and_marks_target_invited() {
        let users = Arc::new(UserRegistry::new());
        let sessions = Arc::new(SessionRegistry::new());
        let bus = SignalBus::new(users.clone(), sessions.clone());
        let rng = FixedRandom(0);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        users.register_user(&alice);
        users.register_user(&bob);

        let c = ctx(&users, &sessions, &bus, &rng);
        let (new_state, session_id) =
            invite_player(&c, &alice, &LobbyState::Unjoined, &bob).await.unwrap();
        assert_eq!(new_state, LobbyState::WaitingForAccepts { session: session_id.clone() });
        assert_eq!(
            users.with_entry(&bob, |e| e.invited_id.clone()).unwrap(),
            Some(session_id)
        );
    }

    #[tokio::test]
    async fn leave_session_destroys_once_empty() {
        let users = Arc::new(UserRegistry::new());
        let sessions = Arc::new(SessionRegistry::new());
        let bus = SignalBus::new(users.clone(), sessions.clone());
        let rng = FixedRandom(0);
        let alice = UserId::new("alice");
        let entry = sessions.create_session(alice.clone(), &rng).unwrap();

        let c = ctx(&users, &sessions, &bus, &rng);
        let new_state = leave_session(&c, &alice, &entry.session_id).await.unwrap();
        assert_eq!(new_state, LobbyState::Unjoined);
        assert!(sessions.get(&entry.session_id).is_none());
    }
}
