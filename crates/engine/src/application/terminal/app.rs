//! `TerminalApplication`: the SSH-side driver. Owns one user's `LobbyState`
//! and dialog stack and renders either the lobby or the game view depending
//! on whether that state has a session attached, reading the session's
//! shared `GameMachine` directly rather than keeping its own copy (§4.2,
//! §4.4). Grounded in the original's `SSHLobbyProtocol`/`SSHGameProtocol`
//! pair, merged into one type because both always operate on the same
//! registry-owned session.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use txwerewolves_domain::game::GamePhase;
use txwerewolves_domain::lobby::{LobbyInput, LobbyState};
use txwerewolves_domain::{Card, RandomPort, SessionId, UserId};

use crate::application::lobby::{self, LobbyCtx};
use crate::registry::{SessionRegistry, UserRegistry};
use crate::signal::{Signal, SignalBus};

use super::dialogs::{
    BriefMessageDialog, ChatDialog, ChoosePlayerDialog, Dialog, DialogOutcome, HelpDialog,
    RenderCtx, SelectionPurpose, SessionAdminDialog,
};
use super::keymap::{app_level_command, AppCommand, Key};
use super::render;
use super::{RedrawScheduler, TerminalSurface};

/// A pending first pick for the Troublemaker's two-step power, held here
/// because the domain machine only exposes `troublemaker_pick_first` /
/// `_second` as two separate calls.
struct PendingTroublemakerPick {
    first: UserId,
}

pub struct TerminalApplication {
    user_id: UserId,
    users: Arc<UserRegistry>,
    sessions: Arc<SessionRegistry>,
    bus: Arc<SignalBus>,
    rng: Arc<dyn RandomPort>,

    surface: std::sync::Mutex<Arc<dyn TerminalSurface>>,
    dims: std::sync::Mutex<(u16, u16)>,
    lobby: AsyncMutex<LobbyState>,
    dialog: AsyncMutex<Option<Box<dyn Dialog>>>,
    troublemaker_pick: AsyncMutex<Option<PendingTroublemakerPick>>,
    redraw: RedrawScheduler,
}

impl TerminalApplication {
    pub fn new(
        user_id: UserId,
        users: Arc<UserRegistry>,
        sessions: Arc<SessionRegistry>,
        bus: Arc<SignalBus>,
        rng: Arc<dyn RandomPort>,
        surface: Arc<dyn TerminalSurface>,
    ) -> Self {
        Self {
            user_id,
            users,
            sessions,
            bus,
            rng,
            surface: std::sync::Mutex::new(surface),
            dims: std::sync::Mutex::new((80, 24)),
            lobby: AsyncMutex::new(LobbyState::Start),
            dialog: AsyncMutex::new(None),
            troublemaker_pick: AsyncMutex::new(None),
            redraw: RedrawScheduler::new(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Rebinds this application onto a fresh connection, e.g. after a
    /// reconnect or a web-to-terminal transport migration (§4.7).
    pub fn rebind_surface(&self, surface: Arc<dyn TerminalSurface>) {
        *self.surface.lock().expect("terminal surface mutex poisoned") = surface;
        self.redraw.cancel();
    }

    pub fn set_dimensions(&self, width: u16, height: u16) {
        *self.dims.lock().expect("terminal dims mutex poisoned") = (width, height);
    }

    /// Restores a migrated-in `LobbyState` token and enters the initial
    /// `Unjoined` state if this is a first login (§4.2, §4.7).
    pub async fn initialize(&self) {
        let mut state = self.lobby.lock().await;
        if *state == LobbyState::Start {
            *state = LobbyState::Unjoined;
        }
    }

    pub async fn restore_lobby_state(&self, state: LobbyState) {
        *self.lobby.lock().await = state;
    }

    pub async fn lobby_snapshot(&self) -> LobbyState {
        self.lobby.lock().await.clone()
    }

    fn ctx<'a>(&'a self) -> LobbyCtx<'a> {
        LobbyCtx {
            users: &self.users,
            sessions: &self.sessions,
            bus: &self.bus,
            rng: self.rng.as_ref(),
        }
    }

    async fn is_owner(&self, session_id: &SessionId) -> bool {
        let Some(entry) = self.sessions.get(session_id) else {
            return false;
        };
        entry.state.lock().await.owner == self.user_id
    }

    /// Entry point for every keystroke the transport decodes (§4.4). Tries
    /// the installed dialog first, then the app-level command table, then
    /// whatever the current lobby/game state accepts.
    pub async fn handle_input(self: &Arc<Self>, key: Key) {
        if let Some(outcome) = self.dispatch_to_dialog(key).await {
            self.apply_dialog_outcome(outcome).await;
            self.request_redraw().await;
            return;
        }

        if let Some(command) = app_level_command(key) {
            self.run_app_command(command).await;
            self.request_redraw().await;
            return;
        }

        self.run_state_command(key).await;
        self.request_redraw().await;
    }

    async fn dispatch_to_dialog(&self, key: Key) -> Option<DialogOutcome> {
        let mut guard = self.dialog.lock().await;
        let dialog = guard.as_mut()?;
        match dialog.handle_input(key) {
            DialogOutcome::Fallthrough => None,
            DialogOutcome::Close => {
                *guard = None;
                Some(DialogOutcome::Close)
            }
            other => Some(other),
        }
    }

    async fn apply_dialog_outcome(&self, outcome: DialogOutcome) {
        match outcome {
            DialogOutcome::SendChat(text) => self.send_chat(text).await,
            DialogOutcome::CommitSettings {
                werewolf_count,
                roles,
            } => self.commit_settings(werewolf_count, roles).await,
            DialogOutcome::PlayerChosen(purpose, target) => {
                self.apply_selection(purpose, target).await
            }
            DialogOutcome::Handled | DialogOutcome::Close | DialogOutcome::Fallthrough => {}
        }
    }

    async fn run_app_command(&self, command: AppCommand) {
        match command {
            AppCommand::Help => self.install_dialog(Box::new(HelpDialog)).await,
            AppCommand::Chat => self.install_dialog(Box::new(ChatDialog::new())).await,
            AppCommand::SessionAdmin => {
                let state = self.lobby_snapshot().await;
                if let Some(session_id) = state.session() {
                    if self.is_owner(session_id).await {
                        if let Some(entry) = self.sessions.get(session_id) {
                            let guard = entry.state.lock().await;
                            let werewolf_count = guard.settings.werewolf_count;
                            let roles = guard.settings.roles.clone();
                            drop(guard);
                            self.install_dialog(Box::new(SessionAdminDialog::new(
                                werewolf_count,
                                roles,
                            )))
                            .await;
                        }
                    }
                }
            }
            AppCommand::Shutdown => {
                let state = self.lobby_snapshot().await;
                if let Some(session_id) = state.session() {
                    if self.is_owner(session_id).await {
                        let _ = lobby::cancel_session(&self.ctx(), &self.user_id, session_id)
                            .await;
                        *self.lobby.lock().await = LobbyState::Unjoined;
                    }
                }
            }
            AppCommand::Drop => {
                self.surface
                    .lock()
                    .expect("terminal surface mutex poisoned")
                    .lose_connection();
            }
        }
    }

    async fn run_state_command(&self, key: Key) {
        let state = self.lobby_snapshot().await;
        match &state {
            LobbyState::Start => {}
            LobbyState::Unjoined => self.run_unjoined_command(key).await,
            LobbyState::Invited { session } => self.run_invited_command(key, session.clone()).await,
            LobbyState::WaitingForAccepts { session } | LobbyState::Accepted { session } => {
                self.run_joined_command(key, session.clone()).await
            }
            LobbyState::SessionStarted { session } => {
                self.run_game_command(key, session.clone()).await
            }
        }
    }

    async fn run_unjoined_command(&self, key: Key) {
        if let Key::Char('i') = key {
            let me = self.user_id.clone();
            let candidates = self.users.generate_users(|e| {
                e.invited_id.is_none() && e.joined_id.is_none()
            });
            let candidates: Vec<UserId> = candidates.into_iter().filter(|u| *u != me).collect();
            self.install_dialog(Box::new(ChoosePlayerDialog::new(
                candidates,
                SelectionPurpose::Invite,
            )))
            .await;
        }
    }

    async fn run_invited_command(&self, key: Key, session: SessionId) {
        match key {
            Key::Char('a') => {
                if let Ok(new_state) =
                    lobby::accept_invitation(&self.ctx(), &self.user_id, &session).await
                {
                    *self.lobby.lock().await = new_state;
                }
            }
            Key::Char('r') => {
                if let Ok(new_state) =
                    lobby::reject_invitation(&self.ctx(), &self.user_id, &session).await
                {
                    *self.lobby.lock().await = new_state;
                }
            }
            _ => {}
        }
    }

    async fn run_joined_command(&self, key: Key, session: SessionId) {
        let owner = self.is_owner(&session).await;
        match key {
            Key::Char('i') if owner => {
                let me = self.user_id.clone();
                let candidates = self
                    .users
                    .generate_users(|e| e.invited_id.is_none() && e.joined_id.is_none());
                let candidates: Vec<UserId> =
                    candidates.into_iter().filter(|u| *u != me).collect();
                self.install_dialog(Box::new(ChoosePlayerDialog::new(
                    candidates,
                    SelectionPurpose::Invite,
                )))
                .await;
            }
            Key::Char('s') if owner => {
                let state = self.lobby_snapshot().await;
                if let Ok(new_state) = lobby::start_session(&self.ctx(), &session, &state).await {
                    *self.lobby.lock().await = new_state;
                }
            }
            Key::Char('c') if owner => {
                let _ = lobby::cancel_session(&self.ctx(), &self.user_id, &session).await;
                *self.lobby.lock().await = LobbyState::Unjoined;
            }
            Key::Char('c') if !owner => {
                if let Ok(new_state) =
                    lobby::leave_session(&self.ctx(), &self.user_id, &session).await
                {
                    *self.lobby.lock().await = new_state;
                }
            }
            _ => {}
        }
    }

    /// Night/day phase commands (§4.4's phase panel): `p` opens the
    /// relevant target picker for the actor's current power, `a` signals
    /// readiness to advance, `v` opens the vote picker at Daybreak.
    async fn run_game_command(&self, key: Key, session: SessionId) {
        let Some(entry) = self.sessions.get(&session) else {
            return;
        };
        let phase = {
            let state = entry.state.lock().await;
            state.game.as_ref().map(|g| g.phase())
        };
        let Some(phase) = phase else { return };

        match (key, phase) {
            (Key::Char('p'), GamePhase::SeerPhase) => {
                self.open_target_dialog(&entry, SelectionPurpose::SeerPlayer)
                    .await;
            }
            (Key::Char('p'), GamePhase::RobberPhase) => {
                self.open_target_dialog(&entry, SelectionPurpose::RobberTarget)
                    .await;
            }
            (Key::Char('p'), GamePhase::TroublemakerPhase) => {
                let purpose = if self.troublemaker_pick.lock().await.is_some() {
                    SelectionPurpose::TroublemakerSecond
                } else {
                    SelectionPurpose::TroublemakerFirst
                };
                self.open_target_dialog(&entry, purpose).await;
            }
            (Key::Char('r'), GamePhase::InsomniacPhase) => {
                let mut state = entry.state.lock().await;
                if let Some(game) = state.game.as_mut() {
                    let _ = game.insomniac_reveal(&self.user_id);
                }
            }
            (Key::Char('v'), GamePhase::Daybreak) => {
                self.open_target_dialog(&entry, SelectionPurpose::Vote).await;
            }
            (Key::Char('a'), _) => {
                let mut state = entry.state.lock().await;
                if let Some(game) = state.game.as_mut() {
                    let _ = game.signal_advance(&self.user_id);
                }
            }
            _ => {}
        }
    }

    async fn open_target_dialog(
        &self,
        entry: &crate::registry::SessionEntry,
        purpose: SelectionPurpose,
    ) {
        let state = entry.state.lock().await;
        let players: Vec<UserId> = state
            .members
            .iter()
            .filter(|p| **p != self.user_id)
            .cloned()
            .collect();
        drop(state);
        self.install_dialog(Box::new(ChoosePlayerDialog::new(players, purpose)))
            .await;
    }

    async fn apply_selection(&self, purpose: SelectionPurpose, target: UserId) {
        match purpose {
            SelectionPurpose::Invite => {
                let state = self.lobby_snapshot().await;
                if let Ok((new_state, _session)) =
                    lobby::invite_player(&self.ctx(), &self.user_id, &state, &target).await
                {
                    *self.lobby.lock().await = new_state;
                }
            }
            SelectionPurpose::SeerPlayer => {
                self.with_session_game(|game| {
                    let _ = game.seer_view_player(&self.user_id, &target);
                })
                .await;
            }
            SelectionPurpose::RobberTarget => {
                self.with_session_game(|game| {
                    let _ = game.robber_steal_card(&self.user_id, &target);
                })
                .await;
            }
            SelectionPurpose::TroublemakerFirst => {
                let user_id = self.user_id.clone();
                self.with_session_game(|game| {
                    let _ = game.troublemaker_pick_first(&user_id, &target);
                })
                .await;
                *self.troublemaker_pick.lock().await =
                    Some(PendingTroublemakerPick { first: target });
            }
            SelectionPurpose::TroublemakerSecond => {
                self.with_session_game(|game| {
                    let _ = game.troublemaker_pick_second(&self.user_id, &target);
                })
                .await;
                *self.troublemaker_pick.lock().await = None;
            }
            SelectionPurpose::Vote => {
                self.with_session_game(|game| {
                    let _ = game.cast_vote(&self.user_id, &target);
                })
                .await;
            }
        }
    }

    async fn with_session_game(&self, f: impl FnOnce(&mut txwerewolves_domain::game::GameMachine)) {
        let state = self.lobby_snapshot().await;
        let Some(session_id) = state.session() else {
            return;
        };
        let Some(entry) = self.sessions.get(session_id) else {
            return;
        };
        let mut guard = entry.state.lock().await;
        if let Some(game) = guard.game.as_mut() {
            f(game);
        }
    }

    async fn send_chat(&self, text: String) {
        let state = self.lobby_snapshot().await;
        let Some(session_id) = state.session() else {
            return;
        };
        if let Some(entry) = self.sessions.get(session_id) {
            entry
                .state
                .lock()
                .await
                .push_chat(self.user_id.clone(), text);
        }
        self.bus
            .send_signal(
                session_id,
                Signal::ChatMessage {
                    sender: self.user_id.clone(),
                },
                crate::signal::SignalOptions::new(),
            )
            .await;
    }

    async fn commit_settings(&self, werewolf_count: u32, roles: HashSet<Card>) {
        let state = self.lobby_snapshot().await;
        let Some(session_id) = state.session() else {
            return;
        };
        if let Some(entry) = self.sessions.get(session_id) {
            let mut guard = entry.state.lock().await;
            guard.settings.set_werewolf_count(werewolf_count);
            guard.settings.roles = roles.clone();
            guard.game = None;
        }
        self.bus
            .send_signal(
                session_id,
                Signal::NewSettings {
                    werewolf_count,
                    roles: roles.iter().map(|c| c.display_name().to_string()).collect(),
                },
                crate::signal::SignalOptions::new(),
            )
            .await;
    }

    async fn install_dialog(&self, dialog: Box<dyn Dialog>) {
        *self.dialog.lock().await = Some(dialog);
    }

    /// Dispatches a `Signal` delivered by the session's `SignalBus` or a
    /// point-to-point notification (§4.6). Every branch ends by scheduling
    /// a redraw rather than drawing inline, matching the "collapse bursts
    /// of signals into one repaint" rule (§4.4, §9).
    pub async fn handle_signal(self: &Arc<Self>, signal: Signal) {
        match signal {
            Signal::Invited { session, .. } => {
                let mut state = self.lobby.lock().await;
                if let Ok(next) = state.transition(LobbyInput::ReceiveInvitation { session }) {
                    *state = next;
                }
            }
            Signal::InviteCancelled { user } if user == self.user_id => {
                *self.lobby.lock().await = LobbyState::Unjoined;
            }
            Signal::InviteCancelled { .. } => {}
            Signal::SessionStarted => {
                let mut state = self.lobby.lock().await;
                if let Ok(next) = state.transition(LobbyInput::StartSession) {
                    *state = next;
                }
            }
            Signal::Shutdown { initiator } => {
                let was_mine = initiator == self.user_id;
                *self.lobby.lock().await = LobbyState::Unjoined;
                if !was_mine {
                    self.install_dialog(Box::new(BriefMessageDialog::new(
                        "The session owner shut down the game.",
                        Some(std::time::Duration::from_secs(3)),
                    )))
                    .await;
                }
            }
            Signal::NextPhase | Signal::ChatMessage { .. } | Signal::Reset => {}
            Signal::NewSettings { .. } => {}
        }
        self.request_redraw().await;
    }

    /// Schedules a repaint through the `RedrawScheduler`, so a burst of
    /// signals or keystrokes between ticks collapses into one write to the
    /// surface (§4.4, §9) rather than one per event.
    pub async fn request_redraw(self: &Arc<Self>) {
        let me = self.clone();
        self.redraw.request(move || {
            tokio::spawn(async move {
                me.paint_now().await;
            });
        });
    }

    async fn paint_now(&self) {
        let frame = self.compose_frame().await;
        self.surface
            .lock()
            .expect("terminal surface mutex poisoned")
            .write(&frame);
    }

    /// Builds the full screen: outer frame, then either the lobby panel or
    /// the game panel, then the installed dialog on top, if any (§4.4's
    /// draw order).
    async fn compose_frame(&self) -> String {
        let (width, height) = *self.dims.lock().expect("terminal dims mutex poisoned");
        let mut out = render::outer_frame(width, height);
        out.push('\n');

        let state = self.lobby_snapshot().await;
        out.push_str(&match &state {
            LobbyState::Start => String::new(),
            LobbyState::Unjoined => lobby::list_players(&self.users),
            LobbyState::Invited { session } => {
                format!("Invited to join session {session}. (a)ccept / (r)eject")
            }
            LobbyState::WaitingForAccepts { session } | LobbyState::Accepted { session } => {
                lobby::joined_players(&self.sessions, session)
                    .await
                    .unwrap_or_default()
            }
            LobbyState::SessionStarted { session } => self.render_game_panel(session).await,
        });

        let dialog_installed = self.dialog.lock().await.is_some();
        if dialog_installed {
            let scrollback: Vec<(UserId, String)> = match state.session() {
                Some(session_id) => match self.sessions.get(session_id) {
                    Some(entry) => entry.state.lock().await.chat.iter().cloned().collect(),
                    None => Vec::new(),
                },
                None => Vec::new(),
            };
            let guard = self.dialog.lock().await;
            let dialog = guard.as_ref().expect("checked installed above");
            out.push('\n');
            out.push_str(&render::section_rule(width));
            out.push('\n');
            out.push_str(&dialog.draw(&RenderCtx {
                width,
                height,
                chat_scrollback: &scrollback,
                pending_settings: (1, &EMPTY_ROLES),
            }));
        }
        out
    }

    async fn render_game_panel(&self, session_id: &SessionId) -> String {
        let Some(entry) = self.sessions.get(session_id) else {
            return String::new();
        };
        let state = entry.state.lock().await;
        let Some(game) = state.game.as_ref() else {
            return String::new();
        };
        let mut out = format!("Phase: {:?}\n", game.phase());
        if game.phase() == GamePhase::Endgame {
            if let Ok(result) = game.post_game_results() {
                out.push_str(&format!("Winner: {:?}\n", result.winner));
            }
        }
        out
    }
}

static EMPTY_ROLES: std::sync::OnceLock<HashSet<Card>> = std::sync::OnceLock::new();

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use txwerewolves_domain::random::FixedRandom;

    #[derive(Default)]
    struct RecordingSurface {
        written: StdMutex<Vec<String>>,
    }

    impl TerminalSurface for RecordingSurface {
        fn reset(&self) {}
        fn cursor(&self, _x: u16, _y: u16) {}
        fn write(&self, text: &str) {
            self.written.lock().unwrap().push(text.to_string());
        }
        fn save_cursor(&self) {}
        fn restore_cursor(&self) {}
        fn lose_connection(&self) {}
    }

    fn new_app(user: &str) -> (Arc<TerminalApplication>, Arc<RecordingSurface>) {
        let users = Arc::new(UserRegistry::new());
        let sessions = Arc::new(SessionRegistry::new());
        let bus = Arc::new(SignalBus::new(users.clone(), sessions.clone()));
        let rng: Arc<dyn RandomPort> = Arc::new(FixedRandom(0));
        let surface = Arc::new(RecordingSurface::default());
        let user_id = UserId::new(user);
        users.register_user(&user_id);
        (
            Arc::new(TerminalApplication::new(
                user_id,
                users,
                sessions,
                bus,
                rng,
                surface.clone(),
            )),
            surface,
        )
    }

    #[tokio::test]
    async fn initialize_moves_from_start_to_unjoined() {
        let (app, _surface) = new_app("alice");
        app.initialize().await;
        assert_eq!(app.lobby_snapshot().await, LobbyState::Unjoined);
    }

    #[tokio::test]
    async fn help_key_installs_and_any_key_closes_the_dialog() {
        let (app, _surface) = new_app("alice");
        app.initialize().await;
        app.handle_input(Key::Char('h')).await;
        tokio::task::yield_now().await;
        assert!(app.dialog.lock().await.is_some());
        app.handle_input(Key::Char('z')).await;
        tokio::task::yield_now().await;
        assert!(app.dialog.lock().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_signal_from_another_user_shows_a_notice() {
        let (app, _surface) = new_app("alice");
        app.initialize().await;
        app.handle_signal(Signal::Shutdown {
            initiator: UserId::new("bob"),
        })
        .await;
        assert_eq!(app.lobby_snapshot().await, LobbyState::Unjoined);
        assert!(app.dialog.lock().await.is_some());
    }
}
