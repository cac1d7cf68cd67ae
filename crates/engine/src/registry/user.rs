//! `UserRegistry`: the process-wide table of users to {avatar, app, session
//! bindings} (§3, §4.1). Ported from the original's module-level
//! `_user_registry` dict plus `UserRegistryEntry` attrs class.

use dashmap::DashMap;
use txwerewolves_domain::{SessionId, UserId};

use crate::application::ApplicationHandle;
use crate::avatar::AvatarHandle;

/// One per distinct user id, for the process lifetime or until explicit
/// logoff. Invariant (§3, §8): `invited_id` and `joined_id` are never both
/// set at once.
#[derive(Default)]
pub struct UserEntry {
    pub avatar: Option<AvatarHandle>,
    pub app: Option<ApplicationHandle>,
    pub invited_id: Option<SessionId>,
    pub joined_id: Option<SessionId>,
}

impl UserEntry {
    fn check_invariant(&self) {
        debug_assert!(
            !(self.invited_id.is_some() && self.joined_id.is_some()),
            "a user entry must never carry both an invited_id and a joined_id"
        );
    }

    pub fn set_invited(&mut self, session: Option<SessionId>) {
        self.invited_id = session;
        self.check_invariant();
    }

    pub fn set_joined(&mut self, session: Option<SessionId>) {
        self.joined_id = session;
        self.check_invariant();
    }
}

/// Process-wide table keyed by `user_id`. One `DashMap` shard per key is
/// enough serialization for the fields here: mutation is always a handful
/// of pointer/Option swaps, never an `.await` held across the guard (async
/// work — delivering a "replaced" notice, sending a signal — always clones
/// what it needs out of the entry first).
pub struct UserRegistry {
    users: DashMap<UserId, UserEntry>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    /// Idempotent: returns the existing entry's user id if already
    /// registered, otherwise creates a fresh one.
    pub fn register_user(&self, user_id: &UserId) -> UserId {
        self.users.entry(user_id.clone()).or_default();
        user_id.clone()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.users.contains_key(user_id)
    }

    /// Snapshot of every registered user id, sorted (matches the original's
    /// `get_user_ids()` returning a sorted list).
    pub fn user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.users.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Snapshot iteration safe against concurrent mutation (§4.1): collects
    /// matching user ids under a read pass, then looks each back up.
    /// Entries created or removed after the snapshot is taken are not
    /// observed, matching "a snapshot semantic is acceptable".
    pub fn generate_users<F>(&self, filter: F) -> Vec<UserId>
    where
        F: Fn(&UserEntry) -> bool,
    {
        self.users
            .iter()
            .filter(|e| filter(e.value()))
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn with_entry<R>(&self, user_id: &UserId, f: impl FnOnce(&UserEntry) -> R) -> Option<R> {
        self.users.get(user_id).map(|e| f(&e))
    }

    pub fn with_entry_mut<R>(
        &self,
        user_id: &UserId,
        f: impl FnOnce(&mut UserEntry) -> R,
    ) -> Option<R> {
        self.users.get_mut(user_id).map(|mut e| f(&mut e))
    }

    pub fn remove(&self, user_id: &UserId) {
        self.users.remove(user_id);
    }
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_user_is_idempotent() {
        let registry = UserRegistry::new();
        let alice = UserId::new("alice");
        registry.register_user(&alice);
        registry.with_entry_mut(&alice, |e| e.set_joined(Some(SessionId::new("green-1"))));
        registry.register_user(&alice);
        let joined = registry
            .with_entry(&alice, |e| e.joined_id.clone())
            .unwrap();
        assert_eq!(joined, Some(SessionId::new("green-1")));
    }

    #[test]
    fn user_ids_are_sorted() {
        let registry = UserRegistry::new();
        registry.register_user(&UserId::new("charlie"));
        registry.register_user(&UserId::new("alice"));
        registry.register_user(&UserId::new("bob"));
        assert_eq!(
            registry.user_ids(),
            vec![
                UserId::new("alice"),
                UserId::new("bob"),
                UserId::new("charlie"),
            ]
        );
    }

    #[test]
    #[should_panic]
    fn invited_and_joined_both_set_trips_the_debug_assertion() {
        let registry = UserRegistry::new();
        let alice = UserId::new("alice");
        registry.register_user(&alice);
        registry.with_entry_mut(&alice, |e| {
            e.set_joined(Some(SessionId::new("green-1")));
            e.set_invited(Some(SessionId::new("blue-2")));
        });
    }
}
