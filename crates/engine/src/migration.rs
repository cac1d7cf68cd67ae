//! Transport migration: moving a user from one connected `Application` to
//! another of the other kind while the game keeps running underneath them
//! (§4.7). Grounded in `apps.py`'s `produce_compatible_application`, which
//! swaps a user's installed protocol object for one of a different
//! transport, carrying the lobby position across via a serialized token.
//!
//! Unlike the original, no part of the `GameMachine` itself needs to move:
//! it already lives in the registry-owned `SessionEntry`, shared by every
//! application bound to that session, so only the per-user `LobbyState`
//! needs to be transplanted.

use std::sync::Arc;

use txwerewolves_domain::UserId;

use crate::application::ApplicationHandle;
use crate::avatar::AvatarHandle;
use crate::registry::UserRegistry;

/// Installs `new_avatar`/`new_app` as `user_id`'s live connection, carrying
/// the old `LobbyState` across first. Whatever was previously bound (on
/// either transport) is told it has been replaced and disconnected.
///
/// `new_app` must already exist (constructed by the calling transport with
/// whatever surface/avatar it has freshly accepted) but not yet be
/// installed in the registry or rendered.
pub async fn migrate(
    users: &UserRegistry,
    user_id: &UserId,
    new_avatar: AvatarHandle,
    new_app: ApplicationHandle,
) -> ApplicationHandle {
    let previous = users.with_entry(user_id, |e| (e.avatar.clone(), e.app.clone()));

    match previous.as_ref().and_then(|(_, app)| app.clone()) {
        Some(old_app) => {
            let token = old_app.lobby_token().await;
            new_app.restore_lobby_token(token).await;
        }
        None => {
            if let ApplicationHandle::Terminal(app) = &new_app {
                app.initialize().await;
            }
            if let ApplicationHandle::Web(app) = &new_app {
                app.initialize().await;
            }
        }
    }

    users.with_entry_mut(user_id, |e| {
        e.avatar = Some(new_avatar);
        e.app = Some(new_app.clone());
    });

    if let Some((Some(old_avatar), _)) = previous {
        old_avatar.notify_replaced();
    }

    new_app.refresh().await;
    new_app
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::terminal::{TerminalApplication, TerminalSurface};
    use crate::registry::SessionRegistry;
    use crate::signal::SignalBus;
    use std::sync::Mutex as StdMutex;
    use txwerewolves_domain::random::FixedRandom;
    use txwerewolves_domain::RandomPort;

    #[derive(Default)]
    struct NullSurface {
        lost: StdMutex<bool>,
    }

    impl TerminalSurface for NullSurface {
        fn reset(&self) {}
        fn cursor(&self, _x: u16, _y: u16) {}
        fn write(&self, _text: &str) {}
        fn save_cursor(&self) {}
        fn restore_cursor(&self) {}
        fn lose_connection(&self) {
            *self.lost.lock().unwrap() = true;
        }
    }

    #[tokio::test]
    async fn first_login_initializes_a_fresh_lobby_state() {
        let users = Arc::new(UserRegistry::new());
        let sessions = Arc::new(SessionRegistry::new());
        let bus = Arc::new(SignalBus::new(users.clone(), sessions.clone()));
        let rng: Arc<dyn RandomPort> = Arc::new(FixedRandom(0));
        let alice = UserId::new("alice");
        users.register_user(&alice);

        let surface: Arc<dyn TerminalSurface> = Arc::new(NullSurface::default());
        let avatar: AvatarHandle = Arc::new(crate::avatar::TerminalAvatar::new(
            alice.clone(),
            surface.clone(),
        ));
        let app = ApplicationHandle::Terminal(Arc::new(TerminalApplication::new(
            alice.clone(),
            users.clone(),
            sessions.clone(),
            bus.clone(),
            rng.clone(),
            surface,
        )));

        let installed = migrate(&users, &alice, avatar, app).await;
        let ApplicationHandle::Terminal(terminal) = installed else {
            panic!("expected terminal application");
        };
        assert_eq!(
            terminal.lobby_snapshot().await,
            txwerewolves_domain::lobby::LobbyState::Unjoined
        );
    }
}
