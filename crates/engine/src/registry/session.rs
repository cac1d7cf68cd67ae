//! `SessionRegistry`: the process-wide table of game sessions to {members,
//! owner, game state, chat ring, settings} (§3, §4.1). Session id
//! generation ports the original's `<color>-<0..999>` tag scheme and
//! 20-retry collision policy verbatim (`session.py::create_session`).

use std::collections::{HashSet, VecDeque};

use dashmap::DashMap;
use txwerewolves_domain::game::GameMachine;
use txwerewolves_domain::{Card, RandomPort, SessionId, UserId};

use crate::error::EngineError;

/// Chat ring capacity (§3, §8): the 51st append evicts the oldest.
pub const CHAT_BUF_SIZE: usize = 50;

/// Session id retry budget (§4.1): fails with `SessionIdExhausted` after
/// this many tag/number collisions.
const MAX_ID_ATTEMPTS: u32 = 20;

/// Color-word table for the `<color>-<0..999>` session id scheme, ported
/// from `session.py::_SESSION_TAGS` verbatim, kept as the one constants
/// table §9 directs box-drawing/id-scheme tables to live in.
const SESSION_TAGS: [&str; 9] = [
    "green", "blue", "red", "yellow", "orange", "white", "black", "pink", "purple",
];

/// Pending werewolf-count / optional-role settings for a session, mutated
/// by the SessionAdmin dialog (§4.4) and committed into a fresh deal on
/// CTRL-R.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub werewolf_count: u32,
    pub roles: HashSet<Card>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            werewolf_count: 1,
            roles: HashSet::new(),
        }
    }
}

impl SessionSettings {
    pub fn set_werewolf_count(&mut self, count: u32) {
        self.werewolf_count = count.clamp(1, 9);
    }

    pub fn toggle_role(&mut self, card: Card) {
        if !self.roles.remove(&card) {
            self.roles.insert(card);
        }
    }
}

/// The mutable part of a session entry, serialized behind one `Mutex` per
/// entry (§5, §9: "implementers on a preemptive runtime must... introduce
/// one mutex per session entry to preserve the stated ordering").
pub struct SessionState {
    pub owner: UserId,
    pub members: HashSet<UserId>,
    pub invited: HashSet<UserId>,
    pub game: Option<GameMachine>,
    pub chat: VecDeque<(UserId, String)>,
    pub settings: SessionSettings,
}

impl SessionState {
    fn new(owner: UserId) -> Self {
        let mut members = HashSet::new();
        members.insert(owner.clone());
        Self {
            owner,
            members,
            invited: HashSet::new(),
            game: None,
            chat: VecDeque::with_capacity(CHAT_BUF_SIZE),
            settings: SessionSettings::default(),
        }
    }

    /// Appends a chat line, dropping the oldest entry once the ring is
    /// full (§3, §5, §8).
    pub fn push_chat(&mut self, sender: UserId, text: String) {
        if self.chat.len() >= CHAT_BUF_SIZE {
            self.chat.pop_front();
        }
        self.chat.push_back((sender, text));
    }
}

/// One per active game session; owns the game machine and chat ring (§3).
pub struct SessionEntry {
    pub session_id: SessionId,
    pub state: tokio::sync::Mutex<SessionState>,
}

/// Process-wide table keyed by `session_id`.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, std::sync::Arc<SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Generates a fresh `<color>-<0..999>` id with up to 20 retries
    /// against collisions, then installs an empty session owned by
    /// `owner` (§4.1). Fails with `SessionIdExhausted` if all attempts
    /// collide.
    pub fn create_session(
        &self,
        owner: UserId,
        rng: &dyn RandomPort,
    ) -> Result<std::sync::Arc<SessionEntry>, EngineError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let tag_idx = rng.gen_range(0, (SESSION_TAGS.len() - 1) as i32) as usize;
            let num = rng.gen_range(0, 999);
            let session_id = SessionId::new(format!("{}-{}", SESSION_TAGS[tag_idx], num));
            if self.sessions.contains_key(&session_id) {
                continue;
            }
            let entry = std::sync::Arc::new(SessionEntry {
                session_id: session_id.clone(),
                state: tokio::sync::Mutex::new(SessionState::new(owner)),
            });
            self.sessions.insert(session_id, entry.clone());
            return Ok(entry);
        }
        Err(EngineError::SessionIdExhausted(MAX_ID_ATTEMPTS))
    }

    pub fn get(&self, session_id: &SessionId) -> Option<std::sync::Arc<SessionEntry>> {
        self.sessions.get(session_id).map(|e| e.clone())
    }

    pub fn destroy_session(&self, session_id: &SessionId) {
        self.sessions.remove(session_id);
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txwerewolves_domain::random::ScriptedRandom;

    #[test]
    fn chat_ring_evicts_oldest_past_fifty() {
        let mut state = SessionState::new(UserId::new("alice"));
        for n in 0..51 {
            state.push_chat(UserId::new("alice"), format!("line {n}"));
        }
        assert_eq!(state.chat.len(), CHAT_BUF_SIZE);
        assert_eq!(state.chat.front().unwrap().1, "line 1");
        assert_eq!(state.chat.back().unwrap().1, "line 50");
    }

    #[test]
    fn create_session_retries_on_collision_then_succeeds() {
        let registry = SessionRegistry::new();
        // First draw collides with a pre-seeded id; second draw succeeds.
        let rng = ScriptedRandom(std::cell::RefCell::new(vec![0, 1, 0, 2]));
        let first = registry.create_session(UserId::new("alice"), &rng).unwrap();
        assert_eq!(first.session_id, SessionId::new("green-1"));
        let second = registry.create_session(UserId::new("bob"), &rng).unwrap();
        assert_eq!(second.session_id, SessionId::new("blue-2"));
    }

    #[test]
    fn owner_is_a_member_on_creation() {
        let registry = SessionRegistry::new();
        let rng = ScriptedRandom(std::cell::RefCell::new(vec![0, 1]));
        let entry = registry.create_session(UserId::new("alice"), &rng).unwrap();
        let state = entry.state.try_lock().unwrap();
        assert!(state.members.contains(&UserId::new("alice")));
        assert_eq!(state.owner, UserId::new("alice"));
    }

    #[test]
    fn destroy_removes_the_entry() {
        let registry = SessionRegistry::new();
        let rng = ScriptedRandom(std::cell::RefCell::new(vec![0, 1]));
        let entry = registry.create_session(UserId::new("alice"), &rng).unwrap();
        registry.destroy_session(&entry.session_id);
        assert!(registry.get(&entry.session_id).is_none());
    }
}
