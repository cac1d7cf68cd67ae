//! Daybreak vote counting, ported from `game.py`'s `count_votes`.

use std::collections::{HashMap, HashSet};

use crate::ids::UserId;

/// Builds a histogram of `votes` (voter -> target), then eliminates every
/// player whose vote count is both greater than 1 and tied for the maximum.
/// If the Hunter is among the eliminated, also eliminates whomever the
/// Hunter voted for.
pub fn count_votes(votes: &HashMap<UserId, UserId>, hunter: Option<&UserId>) -> HashSet<UserId> {
    let mut tally: HashMap<&UserId, u32> = HashMap::new();
    for target in votes.values() {
        *tally.entry(target).or_insert(0) += 1;
    }

    let top = tally.values().copied().max().unwrap_or(0);
    let mut eliminated: HashSet<UserId> = tally
        .into_iter()
        .filter(|(_, count)| *count > 1 && *count == top)
        .map(|(player, _)| player.clone())
        .collect();

    if let Some(hunter) = hunter {
        if eliminated.contains(hunter) {
            if let Some(hunter_target) = votes.get(hunter) {
                eliminated.insert(hunter_target.clone());
            }
        }
    }

    eliminated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(pairs: &[(&str, &str)]) -> HashMap<UserId, UserId> {
        pairs
            .iter()
            .map(|(v, t)| (UserId::new(*v), UserId::new(*t)))
            .collect()
    }

    #[test]
    fn all_unique_votes_eliminate_no_one() {
        let v = votes(&[("alice", "bob"), ("bob", "charlie"), ("charlie", "alice")]);
        assert!(count_votes(&v, None).is_empty());
    }

    #[test]
    fn tied_majority_eliminates_the_tied_players() {
        // alice: 2 votes, bob: 1 vote -> only alice eliminated.
        let v = votes(&[("bob", "alice"), ("charlie", "alice"), ("alice", "bob")]);
        let eliminated = count_votes(&v, None);
        assert_eq!(eliminated, HashSet::from([UserId::new("alice")]));
    }

    #[test]
    fn hunter_among_eliminated_drags_in_their_own_target() {
        // alice (hunter) and bob are both voted twice; hunter alice voted for dave.
        let v = votes(&[
            ("bob", "alice"),
            ("charlie", "alice"),
            ("dave", "bob"),
            ("eve", "bob"),
            ("alice", "dave"),
        ]);
        let eliminated = count_votes(&v, Some(&UserId::new("alice")));
        assert!(eliminated.contains(&UserId::new("alice")));
        assert!(eliminated.contains(&UserId::new("bob")));
        assert!(eliminated.contains(&UserId::new("dave")));
    }
}
