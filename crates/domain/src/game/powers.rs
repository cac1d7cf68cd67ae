//! Role power implementations. All edit `*_current` maps only; `*_original`
//! is never touched.

use std::collections::HashMap;

use crate::card::Card;
use crate::error::DomainError;
use crate::ids::UserId;

/// A completed Seer activation: either a peek at another player's current
/// card, or a peek at two of the three table-card positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeerResult {
    Player { target: UserId, card: Card },
    Table { positions: (usize, usize), cards: (Card, Card) },
}

pub fn seer_view_player(
    current: &HashMap<UserId, Card>,
    target: &UserId,
) -> Result<Card, DomainError> {
    current
        .get(target)
        .copied()
        .ok_or_else(|| DomainError::UnknownPlayer(target.to_string()))
}

pub fn seer_view_table(
    table_current: &[Card; 3],
    a: usize,
    b: usize,
) -> Result<(Card, Card), DomainError> {
    if a == b || a >= 3 || b >= 3 {
        return Err(DomainError::invalid_transition(format!(
            "invalid table positions ({a}, {b})"
        )));
    }
    Ok((table_current[a], table_current[b]))
}

/// Ports `_robber_steal_card` verbatim: the robber swaps their current card
/// for `target`'s current card. Returns the card the robber now holds.
pub fn robber_steal_card(
    current: &mut HashMap<UserId, Card>,
    robber_player: &UserId,
    target: &UserId,
) -> Result<Card, DomainError> {
    let target_card = current
        .get(target)
        .copied()
        .ok_or_else(|| DomainError::UnknownPlayer(target.to_string()))?;
    current.insert(target.clone(), Card::Robber);
    current.insert(robber_player.clone(), target_card);
    Ok(target_card)
}

/// Swaps two other players' current cards without revealing them.
pub fn troublemaker_switch_cards(
    current: &mut HashMap<UserId, Card>,
    a: &UserId,
    b: &UserId,
) -> Result<(), DomainError> {
    let card_a = current
        .get(a)
        .copied()
        .ok_or_else(|| DomainError::UnknownPlayer(a.to_string()))?;
    let card_b = current
        .get(b)
        .copied()
        .ok_or_else(|| DomainError::UnknownPlayer(b.to_string()))?;
    current.insert(a.clone(), card_b);
    current.insert(b.clone(), card_a);
    Ok(())
}

pub fn insomniac_reveal(
    current: &HashMap<UserId, Card>,
    insomniac_player: &UserId,
) -> Result<Card, DomainError> {
    current
        .get(insomniac_player)
        .copied()
        .ok_or_else(|| DomainError::UnknownPlayer(insomniac_player.to_string()))
}

/// Players currently holding `card`, sorted for determinism. Used by the
/// Werewolf/Minion observation phases.
pub fn holders_of(current: &HashMap<UserId, Card>, card: Card) -> Vec<UserId> {
    let mut holders: Vec<UserId> = current
        .iter()
        .filter(|(_, c)| **c == card)
        .map(|(p, _)| p.clone())
        .collect();
    holders.sort();
    holders
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, Card)]) -> HashMap<UserId, Card> {
        pairs
            .iter()
            .map(|(id, c)| (UserId::new(*id), *c))
            .collect()
    }

    #[test]
    fn robber_swap_gives_robber_the_targets_card_and_leaves_it_at_target() {
        let mut current = map(&[("alice", Card::Robber), ("bob", Card::Villager)]);
        let stolen = robber_steal_card(&mut current, &UserId::new("alice"), &UserId::new("bob"))
            .unwrap();
        assert_eq!(stolen, Card::Villager);
        assert_eq!(current[&UserId::new("alice")], Card::Villager);
        assert_eq!(current[&UserId::new("bob")], Card::Robber);
    }

    #[test]
    fn troublemaker_swap_exchanges_two_others_without_touching_troublemaker() {
        let mut current = map(&[
            ("alice", Card::Troublemaker),
            ("bob", Card::Villager),
            ("charlie", Card::Werewolf),
        ]);
        troublemaker_switch_cards(&mut current, &UserId::new("bob"), &UserId::new("charlie"))
            .unwrap();
        assert_eq!(current[&UserId::new("alice")], Card::Troublemaker);
        assert_eq!(current[&UserId::new("bob")], Card::Werewolf);
        assert_eq!(current[&UserId::new("charlie")], Card::Villager);
    }

    #[test]
    fn holders_of_is_sorted_and_may_be_empty() {
        let current = map(&[("bob", Card::Villager), ("alice", Card::Werewolf)]);
        assert!(holders_of(&current, Card::Werewolf).contains(&UserId::new("alice")));
        assert!(holders_of(&current, Card::Tanner).is_empty());
    }
}
