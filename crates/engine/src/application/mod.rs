//! The two concrete `Application` kinds a user's avatar may be bound to,
//! and the handle both registries and the signal bus address them through.
//!
//! The original lets an `Application` be either SSH or web duck-typed
//! behind the same `app_proto.py` interface. Here the set of transports is
//! closed and known at compile time, so a two-variant enum replaces the
//! duck-typed interface: no downcasting is ever needed when migrating a
//! user from one transport to the other (§4.7).

pub mod lobby;
pub mod terminal;
pub mod web;

use std::sync::Arc;

use txwerewolves_domain::UserId;

use crate::signal::Signal;
use terminal::app::TerminalApplication;
use web::app::WebApplication;

/// Which transport an `ApplicationHandle` is currently bound to (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppTransportKind {
    Terminal,
    Web,
}

#[derive(Clone)]
pub enum ApplicationHandle {
    Terminal(Arc<TerminalApplication>),
    Web(Arc<WebApplication>),
}

impl ApplicationHandle {
    pub fn user_id(&self) -> &UserId {
        match self {
            ApplicationHandle::Terminal(app) => app.user_id(),
            ApplicationHandle::Web(app) => app.user_id(),
        }
    }

    pub fn kind(&self) -> AppTransportKind {
        match self {
            ApplicationHandle::Terminal(_) => AppTransportKind::Terminal,
            ApplicationHandle::Web(_) => AppTransportKind::Web,
        }
    }

    pub async fn handle_signal(&self, signal: Signal) {
        match self {
            ApplicationHandle::Terminal(app) => app.handle_signal(signal).await,
            ApplicationHandle::Web(app) => app.handle_signal(signal).await,
        }
    }

    /// Repaints this application against its current state, without a
    /// triggering signal. Used right after a transport migration installs
    /// a freshly-restored `LobbyState` (§4.7).
    pub async fn refresh(&self) {
        match self {
            ApplicationHandle::Terminal(app) => app.request_redraw().await,
            ApplicationHandle::Web(app) => app.render().await,
        }
    }

    pub async fn lobby_token(&self) -> txwerewolves_domain::lobby::LobbyToken {
        match self {
            ApplicationHandle::Terminal(app) => app.lobby_snapshot().await.serialize(),
            ApplicationHandle::Web(app) => app.lobby_snapshot().await.serialize(),
        }
    }

    pub async fn restore_lobby_token(&self, token: txwerewolves_domain::lobby::LobbyToken) {
        let state = txwerewolves_domain::lobby::LobbyState::restore(token);
        match self {
            ApplicationHandle::Terminal(app) => app.restore_lobby_state(state).await,
            ApplicationHandle::Web(app) => app.restore_lobby_state(state).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApplicationHandle>();
    }
}
