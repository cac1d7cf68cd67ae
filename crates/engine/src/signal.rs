//! Session-scoped fan-out of typed events to members (§4.6). A `Signal` is
//! a Rust enum rather than a stringly-typed `(name, payload)` pair,
//! dispatched via `match` in each `ApplicationAdapter`'s `handle_signal`;
//! `SignalOptions` replaces named bool parameters with a small builder
//! struct in place of a long positional argument list.

use std::collections::HashSet;
use std::sync::Arc;

use txwerewolves_domain::UserId;

use crate::registry::{SessionRegistry, UserRegistry};

/// Typed events delivered from one application to another in the same
/// session (§4.6, GLOSSARY).
#[derive(Debug, Clone)]
pub enum Signal {
    /// A game phase changed; recipients re-render the phase.
    NextPhase,
    /// A new chat line exists in the session ring.
    ChatMessage { sender: UserId },
    /// A member is leaving. `initiator` is who triggered it; recipients
    /// other than the initiator show a system dialog before reverting to
    /// lobby (§4.6).
    Shutdown { initiator: UserId },
    /// The owner changed settings and restarted the game.
    Reset,
    /// Sent directly to one not-yet-a-member user: they have been invited
    /// into `session` by `from`. Delivered point-to-point (the recipient
    /// is not yet in the session's member/invited broadcast set when the
    /// invite is first issued), not through `SignalBus::send_signal`.
    Invited { session: txwerewolves_domain::SessionId, from: UserId },
    /// Recipient drops pending-invitation bookkeeping.
    InviteCancelled { user: UserId },
    /// All members' lobby machines should advance into the game view; the
    /// session's game has just been dealt.
    SessionStarted,
    /// Consumed by the owner's web settings dialog.
    NewSettings {
        werewolf_count: u32,
        roles: Vec<String>,
    },
}

/// Delivery options for `SignalBus::send_signal` (§4.6): whether to reach
/// invited-but-not-yet-joined users, and who to skip.
#[derive(Debug, Clone, Default)]
pub struct SignalOptions {
    pub include_invited: bool,
    pub exclude: HashSet<UserId>,
}

impl SignalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_invited(mut self) -> Self {
        self.include_invited = true;
        self
    }

    pub fn excluding(mut self, user: UserId) -> Self {
        self.exclude.insert(user);
        self
    }
}

/// Fans a signal out to every member (plus invited users, if requested,
/// minus any excluded) of one session. Delivery to each recipient's bound
/// application happens in its own scheduled task, so siblings may observe
/// signals from different emitters out of order relative to each other,
/// but always in order within one emitter (§5).
pub struct SignalBus {
    users: Arc<UserRegistry>,
    sessions: Arc<SessionRegistry>,
}

impl SignalBus {
    pub fn new(users: Arc<UserRegistry>, sessions: Arc<SessionRegistry>) -> Self {
        Self { users, sessions }
    }

    pub async fn send_signal(
        &self,
        session_id: &txwerewolves_domain::SessionId,
        signal: Signal,
        options: SignalOptions,
    ) {
        let Some(session) = self.sessions.get(session_id) else {
            return;
        };
        let recipients: Vec<UserId> = {
            let state = session.state.lock().await;
            let mut recipients: Vec<UserId> = state.members.iter().cloned().collect();
            if options.include_invited {
                recipients.extend(state.invited.iter().cloned());
            }
            recipients
        };

        for recipient in recipients {
            if options.exclude.contains(&recipient) {
                continue;
            }
            let app = self
                .users
                .with_entry(&recipient, |entry| entry.app.clone())
                .flatten();
            let Some(app) = app else { continue };
            let signal = signal.clone();
            // One spawned delivery per recipient (§5): this recipient's
            // signals from this emitter still arrive in program order
            // because each `send_signal` call awaits here before the next
            // one is issued by the caller.
            tokio::spawn(async move {
                app.handle_signal(signal).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ApplicationHandle;

    #[tokio::test]
    async fn excluded_recipient_is_skipped() {
        let users = Arc::new(UserRegistry::new());
        let sessions = Arc::new(SessionRegistry::new());
        let alice = UserId::new("alice");
        users.register_user(&alice);
        let rng = txwerewolves_domain::random::FixedRandom(0);
        let entry = sessions.create_session(alice.clone(), &rng).unwrap();

        let bus = SignalBus::new(users.clone(), sessions.clone());
        // No app bound to alice, so this just exercises the skip path
        // without panicking when there is nothing to deliver to.
        bus.send_signal(
            &entry.session_id,
            Signal::Reset,
            SignalOptions::new().excluding(alice),
        )
        .await;
    }

    #[test]
    fn application_handle_is_not_constructed_here() {
        // Compile-time check that the signal module only depends on the
        // `ApplicationHandle` type, not a concrete adapter.
        fn _assert_send_sync<T: Send + Sync>() {}
        _assert_send_sync::<ApplicationHandle>();
    }
}
