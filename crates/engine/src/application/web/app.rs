//! `WebApplication`: the browser-side driver (§4.5). Mirrors
//! `TerminalApplication`'s lobby/game logic but renders by pushing typed
//! `WebEvent`s to its bound `WebAvatar` instead of composing a terminal
//! frame, and exposes a rebuildable action-id table so `/action` posts can
//! be interpreted statelessly by the browser (ported from
//! `webauth.py`'s per-render `_action_table` rebinding).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use txwerewolves_domain::game::GamePhase;
use txwerewolves_domain::lobby::{LobbyInput, LobbyState};
use txwerewolves_domain::{Card, RandomPort, SessionId, UserId};
use txwerewolves_shared::{
    AppKind, ChatData, PhaseInfoData, PlayerInfoData, PostGameResultsData, SettingsInfoData,
    WebEvent,
};

use crate::application::lobby::{self, LobbyCtx};
use crate::avatar::WebAvatar;
use crate::registry::{SessionRegistry, UserRegistry};
use crate::signal::{Signal, SignalBus, SignalOptions};

/// What a rebound action id triggers when `/action` posts it back
/// (§4.5's "actions" event: each entry is `(label, id, post_action_text)`).
#[derive(Debug, Clone)]
enum WebAction {
    Invite(UserId),
    AcceptInvite,
    RejectInvite,
    StartSession,
    CancelSession,
    LeaveSession,
    SeerPlayer(UserId),
    RobberTarget(UserId),
    TroublemakerFirst(UserId),
    TroublemakerSecond(UserId),
    InsomniacReveal,
    Vote(UserId),
    SignalAdvance,
}

pub struct WebApplication {
    user_id: UserId,
    users: Arc<UserRegistry>,
    sessions: Arc<SessionRegistry>,
    bus: Arc<SignalBus>,
    rng: Arc<dyn RandomPort>,

    avatar: std::sync::Mutex<Arc<WebAvatar>>,
    lobby: AsyncMutex<LobbyState>,
    actions: AsyncMutex<HashMap<u32, WebAction>>,
    next_action_id: AtomicU32,
    troublemaker_pick: AsyncMutex<Option<UserId>>,
}

impl WebApplication {
    pub fn new(
        user_id: UserId,
        users: Arc<UserRegistry>,
        sessions: Arc<SessionRegistry>,
        bus: Arc<SignalBus>,
        rng: Arc<dyn RandomPort>,
        avatar: Arc<WebAvatar>,
    ) -> Self {
        Self {
            user_id,
            users,
            sessions,
            bus,
            rng,
            avatar: std::sync::Mutex::new(avatar),
            lobby: AsyncMutex::new(LobbyState::Start),
            actions: AsyncMutex::new(HashMap::new()),
            next_action_id: AtomicU32::new(1),
            troublemaker_pick: AsyncMutex::new(None),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn rebind_avatar(&self, avatar: Arc<WebAvatar>) {
        *self.avatar.lock().expect("web avatar mutex poisoned") = avatar;
    }

    pub async fn lobby_snapshot(&self) -> LobbyState {
        self.lobby.lock().await.clone()
    }

    pub async fn restore_lobby_state(&self, state: LobbyState) {
        *self.lobby.lock().await = state;
    }

    fn ctx(&self) -> LobbyCtx<'_> {
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

    fn emit(&self, event: WebEvent) {
        self.avatar
            .lock()
            .expect("web avatar mutex poisoned")
            .send_event(&event);
    }

    pub async fn initialize(&self) {
        {
            let mut state = self.lobby.lock().await;
            if *state == LobbyState::Start {
                *state = LobbyState::Unjoined;
            }
        }
        self.emit(WebEvent::InstallApp(AppKind::Lobby));
        self.render().await;
    }

    /// Rebuilds the `actions` table (§4.5: ids are only valid for one
    /// render) and emits `status` + `actions` + whatever panel events the
    /// current state calls for.
    pub async fn render(&self) {
        let state = self.lobby_snapshot().await;
        let mut actions = HashMap::new();

        let status = match &state {
            LobbyState::Start => String::new(),
            LobbyState::Unjoined => lobby::list_players(&self.users),
            LobbyState::Invited { session } => {
                self.register(&mut actions, WebAction::AcceptInvite);
                self.register(&mut actions, WebAction::RejectInvite);
                format!("Invited to join session {session}.")
            }
            LobbyState::WaitingForAccepts { session } | LobbyState::Accepted { session } => {
                let owner = self.is_owner(session).await;
                if owner {
                    self.register(&mut actions, WebAction::StartSession);
                    self.register(&mut actions, WebAction::CancelSession);
                } else {
                    self.register(&mut actions, WebAction::LeaveSession);
                }
                let me = self.user_id.clone();
                for candidate in self
                    .users
                    .generate_users(|e| e.invited_id.is_none() && e.joined_id.is_none())
                    .into_iter()
                    .filter(|u| *u != me)
                {
                    self.register(&mut actions, WebAction::Invite(candidate));
                }
                lobby::joined_players(&self.sessions, session)
                    .await
                    .unwrap_or_default()
            }
            LobbyState::SessionStarted { session } => {
                self.emit(WebEvent::InstallApp(AppKind::Werewolves));
                self.render_game(session, &mut actions).await
            }
        };

        let labeled: Vec<_> = actions
            .iter()
            .map(|(id, action)| (label_for(action), *id, String::new()))
            .collect();
        *self.actions.lock().await = actions;

        self.emit(WebEvent::Status(status));
        self.emit(WebEvent::Actions(labeled));
    }

    fn register(&self, actions: &mut HashMap<u32, WebAction>, action: WebAction) {
        let id = self.next_action_id.fetch_add(1, Ordering::Relaxed);
        actions.insert(id, action);
    }

    async fn render_game(&self, session_id: &SessionId, actions: &mut HashMap<u32, WebAction>) -> String {
        let Some(entry) = self.sessions.get(session_id) else {
            return String::new();
        };
        let state = entry.state.lock().await;
        let Some(game) = state.game.as_ref() else {
            return String::new();
        };
        let phase = game.phase();

        self.emit(WebEvent::PhaseInfo(PhaseInfoData {
            name: format!("{phase:?}"),
            description: phase_description(phase),
        }));

        if let Some(card) = game.original_card_of(&self.user_id) {
            self.emit(WebEvent::PlayerInfo(PlayerInfoData {
                user_id: self.user_id.to_string(),
                card_name: card.display_name().to_string(),
            }));
        }

        let others: Vec<UserId> = state
            .members
            .iter()
            .filter(|p| **p != self.user_id)
            .cloned()
            .collect();

        match phase {
            GamePhase::SeerPhase if game.original_card_of(&self.user_id) == Some(Card::Seer) => {
                for p in others {
                    self.register(actions, WebAction::SeerPlayer(p));
                }
            }
            GamePhase::RobberPhase
                if game.original_card_of(&self.user_id) == Some(Card::Robber) =>
            {
                for p in others {
                    self.register(actions, WebAction::RobberTarget(p));
                }
            }
            GamePhase::TroublemakerPhase
                if game.original_card_of(&self.user_id) == Some(Card::Troublemaker) =>
            {
                let pending = self.troublemaker_pick.lock().await.is_some();
                for p in others {
                    if pending {
                        self.register(actions, WebAction::TroublemakerSecond(p));
                    } else {
                        self.register(actions, WebAction::TroublemakerFirst(p));
                    }
                }
            }
            GamePhase::InsomniacPhase
                if game.original_card_of(&self.user_id) == Some(Card::Insomniac) =>
            {
                self.register(actions, WebAction::InsomniacReveal);
            }
            GamePhase::Daybreak => {
                for p in others {
                    self.register(actions, WebAction::Vote(p));
                }
            }
            _ => {}
        }
        if phase != GamePhase::Endgame {
            self.register(actions, WebAction::SignalAdvance);
        }

        if phase == GamePhase::Endgame {
            if let Ok(result) = game.post_game_results() {
                self.emit(WebEvent::PostGameResults(PostGameResultsData {
                    winner: format!("{:?}", result.winner),
                    player_cards_original: result
                        .player_cards_original
                        .iter()
                        .map(|(u, c)| (u.to_string(), c.display_name().to_string()))
                        .collect(),
                    player_cards_current: result
                        .player_cards_current
                        .iter()
                        .map(|(u, c)| (u.to_string(), c.display_name().to_string()))
                        .collect(),
                    table_cards_original: result.table_cards_original.map(|c| c.display_name().to_string()),
                    table_cards_current: result.table_cards_current.map(|c| c.display_name().to_string()),
                    eliminated: result.eliminated.iter().map(UserId::to_string).collect(),
                }));
            }
        }

        format!("{phase:?}")
    }

    /// Handles one `/action` POST body against the currently-bound table
    /// (§4.5). Stale ids (from a since-rebuilt table) are silently ignored.
    pub async fn handle_action(&self, command: u32) {
        let action = self.actions.lock().await.get(&command).cloned();
        let Some(action) = action else { return };
        match action {
            WebAction::Invite(target) => {
                let state = self.lobby_snapshot().await;
                if let Ok((new_state, _)) =
                    lobby::invite_player(&self.ctx(), &self.user_id, &state, &target).await
                {
                    *self.lobby.lock().await = new_state;
                }
            }
            WebAction::AcceptInvite => {
                let state = self.lobby_snapshot().await;
                if let Some(session) = state.session() {
                    if let Ok(new_state) =
                        lobby::accept_invitation(&self.ctx(), &self.user_id, session).await
                    {
                        *self.lobby.lock().await = new_state;
                    }
                }
            }
            WebAction::RejectInvite => {
                let state = self.lobby_snapshot().await;
                if let Some(session) = state.session() {
                    if let Ok(new_state) =
                        lobby::reject_invitation(&self.ctx(), &self.user_id, session).await
                    {
                        *self.lobby.lock().await = new_state;
                    }
                }
            }
            WebAction::StartSession => {
                let state = self.lobby_snapshot().await;
                if let Some(session) = state.session() {
                    if let Ok(new_state) = lobby::start_session(&self.ctx(), session, &state).await
                    {
                        *self.lobby.lock().await = new_state;
                    }
                }
            }
            WebAction::CancelSession => {
                let state = self.lobby_snapshot().await;
                if let Some(session) = state.session() {
                    let _ = lobby::cancel_session(&self.ctx(), &self.user_id, session).await;
                    *self.lobby.lock().await = LobbyState::Unjoined;
                }
            }
            WebAction::LeaveSession => {
                let state = self.lobby_snapshot().await;
                if let Some(session) = state.session() {
                    if let Ok(new_state) =
                        lobby::leave_session(&self.ctx(), &self.user_id, session).await
                    {
                        *self.lobby.lock().await = new_state;
                    }
                }
            }
            WebAction::SeerPlayer(target) => {
                self.with_game(|game| {
                    let _ = game.seer_view_player(&self.user_id, &target);
                })
                .await;
            }
            WebAction::RobberTarget(target) => {
                self.with_game(|game| {
                    let _ = game.robber_steal_card(&self.user_id, &target);
                })
                .await;
            }
            WebAction::TroublemakerFirst(target) => {
                let user_id = self.user_id.clone();
                self.with_game(|game| {
                    let _ = game.troublemaker_pick_first(&user_id, &target);
                })
                .await;
                *self.troublemaker_pick.lock().await = Some(target);
            }
            WebAction::TroublemakerSecond(target) => {
                self.with_game(|game| {
                    let _ = game.troublemaker_pick_second(&self.user_id, &target);
                })
                .await;
                *self.troublemaker_pick.lock().await = None;
            }
            WebAction::InsomniacReveal => {
                let user_id = self.user_id.clone();
                self.with_game(|game| {
                    let _ = game.insomniac_reveal(&user_id);
                })
                .await;
            }
            WebAction::Vote(target) => {
                self.with_game(|game| {
                    let _ = game.cast_vote(&self.user_id, &target);
                })
                .await;
            }
            WebAction::SignalAdvance => {
                let user_id = self.user_id.clone();
                self.with_game(|game| {
                    let _ = game.signal_advance(&user_id);
                })
                .await;
            }
        }
        self.render().await;
    }

    async fn with_game(&self, f: impl FnOnce(&mut txwerewolves_domain::game::GameMachine)) {
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

    pub async fn handle_chat(&self, text: String) {
        let state = self.lobby_snapshot().await;
        let Some(session_id) = state.session() else {
            return;
        };
        if let Some(entry) = self.sessions.get(session_id) {
            entry
                .state
                .lock()
                .await
                .push_chat(self.user_id.clone(), text.clone());
        }
        self.emit(WebEvent::Chat(ChatData {
            sender: self.user_id.to_string(),
            message: text,
        }));
        self.bus
            .send_signal(
                session_id,
                Signal::ChatMessage {
                    sender: self.user_id.clone(),
                },
                SignalOptions::new(),
            )
            .await;
    }

    pub async fn handle_settings(&self, werewolf_count: u32, roles: Vec<String>) {
        let state = self.lobby_snapshot().await;
        let Some(session_id) = state.session() else {
            return;
        };
        let role_cards: Vec<Card> = roles.iter().filter_map(|r| parse_card(r)).collect();
        if let Some(entry) = self.sessions.get(session_id) {
            let mut guard = entry.state.lock().await;
            guard.settings.set_werewolf_count(werewolf_count);
            guard.settings.roles = role_cards.iter().copied().collect();
            guard.game = None;
        }
        self.emit(WebEvent::SettingsInfo(SettingsInfoData {
            werewolf_count,
            roles: role_cards.iter().map(|c| c.display_name().to_string()).collect(),
        }));
        self.bus
            .send_signal(
                session_id,
                Signal::NewSettings {
                    werewolf_count,
                    roles: role_cards.iter().map(|c| c.display_name().to_string()).collect(),
                },
                SignalOptions::new(),
            )
            .await;
    }

    pub async fn handle_signal(&self, signal: Signal) {
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
                    self.emit(WebEvent::ShutDown(txwerewolves_shared::ShutDownData {
                        initiator: initiator.to_string(),
                    }));
                }
            }
            Signal::NextPhase | Signal::ChatMessage { .. } | Signal::Reset => {}
            Signal::NewSettings { .. } => {}
        }
        self.render().await;
    }
}

fn label_for(action: &WebAction) -> String {
    match action {
        WebAction::Invite(user) => format!("Invite {user}"),
        WebAction::AcceptInvite => "Accept".to_string(),
        WebAction::RejectInvite => "Reject".to_string(),
        WebAction::StartSession => "Start game".to_string(),
        WebAction::CancelSession => "Cancel session".to_string(),
        WebAction::LeaveSession => "Leave session".to_string(),
        WebAction::SeerPlayer(user) => format!("Peek at {user}"),
        WebAction::RobberTarget(user) => format!("Swap with {user}"),
        WebAction::TroublemakerFirst(user) => format!("Choose {user}"),
        WebAction::TroublemakerSecond(user) => format!("Swap with {user}"),
        WebAction::InsomniacReveal => "Check my card".to_string(),
        WebAction::Vote(user) => format!("Vote {user}"),
        WebAction::SignalAdvance => "Ready".to_string(),
    }
}

fn phase_description(phase: GamePhase) -> String {
    match phase {
        GamePhase::HavePlayers => "Waiting for players.".to_string(),
        GamePhase::CardsDealt => "Cards dealt.".to_string(),
        GamePhase::WerewolfPhase => "Werewolves wake and see each other.".to_string(),
        GamePhase::MinionPhase => "The Minion wakes and sees the Werewolves.".to_string(),
        GamePhase::SeerPhase => "The Seer may peek at a player or table cards.".to_string(),
        GamePhase::SeerPowerActivated => "The Seer's power resolves.".to_string(),
        GamePhase::RobberPhase => "The Robber may swap cards with another player.".to_string(),
        GamePhase::RobberPowerActivated => "The Robber's power resolves.".to_string(),
        GamePhase::TroublemakerPhase => {
            "The Troublemaker may swap two other players' cards.".to_string()
        }
        GamePhase::TroublemakerPowerActivated => "The Troublemaker's power resolves.".to_string(),
        GamePhase::InsomniacPhase => "The Insomniac checks their current card.".to_string(),
        GamePhase::Daybreak => "Discuss, then vote for who to eliminate.".to_string(),
        GamePhase::Endgame => "The game is over.".to_string(),
    }
}

fn parse_card(name: &str) -> Option<Card> {
    Card::OPTIONAL_ROLES
        .into_iter()
        .find(|c| c.display_name().eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use txwerewolves_domain::random::FixedRandom;

    fn new_app(user: &str) -> WebApplication {
        let users = Arc::new(UserRegistry::new());
        let sessions = Arc::new(SessionRegistry::new());
        let bus = Arc::new(SignalBus::new(users.clone(), sessions.clone()));
        let rng: Arc<dyn RandomPort> = Arc::new(FixedRandom(0));
        let user_id = UserId::new(user);
        users.register_user(&user_id);
        let avatar = Arc::new(WebAvatar::new(user_id.clone()));
        WebApplication::new(user_id, users, sessions, bus, rng, avatar)
    }

    #[tokio::test]
    async fn initialize_moves_to_unjoined_and_emits_lobby_app() {
        let app = new_app("alice");
        app.initialize().await;
        assert_eq!(app.lobby_snapshot().await, LobbyState::Unjoined);
    }

    #[tokio::test]
    async fn unknown_action_id_is_ignored() {
        let app = new_app("alice");
        app.initialize().await;
        app.handle_action(9999).await;
        assert_eq!(app.lobby_snapshot().await, LobbyState::Unjoined);
    }

    #[test]
    fn parse_card_is_case_insensitive() {
        assert_eq!(parse_card("seer"), Some(Card::Seer));
        assert_eq!(parse_card("nonexistent"), None);
    }
}
